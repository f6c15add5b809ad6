//! Reference restricted to objects of one concrete type

use super::{Object, Reference};
use crate::heap::Heap;
use core::ptr::NonNull;
use std::sync::Arc;

/// `Reference` that is valid only while it points to a `T`
///
/// Adopting an object of another type leaves the handle invalid and
/// releases the adopted share immediately.
pub struct ReferenceT<T: Object> {
    reference: Reference,
    typed: Option<NonNull<T>>,
}

impl<T: Object> ReferenceT<T> {
    pub const fn invalid() -> Self {
        Self {
            reference: Reference::invalid(),
            typed: None,
        }
    }

    pub fn new(object: T) -> Self {
        Self::from_reference(Reference::new(object))
    }

    pub fn new_in(object: T, heap: &Arc<dyn Heap>) -> Self {
        Self::from_reference(Reference::new_in(object, heap))
    }

    pub fn from_class_name(class_name: &str) -> Self {
        Self::from_reference(Reference::from_class_name(class_name))
    }

    pub fn from_class_name_in(class_name: &str, heap: &Arc<dyn Heap>) -> Self {
        Self::from_reference(Reference::from_class_name_in(class_name, heap))
    }

    pub fn from_reference(reference: Reference) -> Self {
        let typed = reference.downcast_ref::<T>().map(NonNull::from);
        match typed {
            Some(typed) => Self {
                reference,
                typed: Some(typed),
            },
            None => Self::invalid(),
        }
    }

    /// Retarget; the previous object is released after the new one is adopted
    pub fn set(&mut self, reference: Reference) {
        *self = Self::from_reference(reference);
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.typed.is_some()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: `reference` keeps the object alive while `typed` is set
        self.typed.map(|typed| unsafe { &*typed.as_ptr() })
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn into_reference(self) -> Reference {
        self.reference
    }

    pub fn number_of_references(&self) -> u32 {
        self.reference.number_of_references()
    }

    pub fn remove_reference(&mut self) {
        self.typed = None;
        self.reference.remove_reference();
    }
}

impl<T: Object> Default for ReferenceT<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T: Object> Clone for ReferenceT<T> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            typed: self.typed,
        }
    }
}

impl<T: Object> PartialEq for ReferenceT<T> {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl<T: Object> PartialEq<Reference> for ReferenceT<T> {
    fn eq(&self, other: &Reference) -> bool {
        &self.reference == other
    }
}

impl<T: Object> From<Reference> for ReferenceT<T> {
    fn from(reference: Reference) -> Self {
        Self::from_reference(reference)
    }
}

impl<T: Object> From<ReferenceT<T>> for Reference {
    fn from(reference: ReferenceT<T>) -> Self {
        reference.into_reference()
    }
}

impl<T: Object> From<&ReferenceT<T>> for Reference {
    fn from(reference: &ReferenceT<T>) -> Self {
        reference.reference.clone()
    }
}

impl<T: Object> core::fmt::Debug for ReferenceT<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReferenceT")
            .field("type", &core::any::type_name::<T>())
            .field("reference", &self.reference)
            .finish()
    }
}

unsafe impl<T: Object> Send for ReferenceT<T> {}
unsafe impl<T: Object> Sync for ReferenceT<T> {}
