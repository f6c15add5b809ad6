//! State shared by every object: reference count, name, class attribution

use crate::registry::ClassRegistryItem;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::Object;

/// Common header embedded in every `Object` implementation
pub struct ObjectBase {
    references: AtomicU32,
    name: RwLock<Option<String>>,
    domain: AtomicBool,
    class: OnceCell<Arc<ClassRegistryItem>>,
}

impl ObjectBase {
    pub fn new() -> Self {
        Self {
            references: AtomicU32::new(0),
            name: RwLock::new(None),
            domain: AtomicBool::new(false),
            class: OnceCell::new(),
        }
    }

    pub fn named(name: &str) -> Self {
        let base = Self::new();
        base.set_name(name);
        base
    }

    /// Fresh header carrying over name and domain flag
    ///
    /// The copy starts unreferenced and is attributed to a class only once
    /// it is placed behind a `Reference`.
    pub fn duplicate(&self) -> Self {
        Self {
            references: AtomicU32::new(0),
            name: RwLock::new(self.name()),
            domain: AtomicBool::new(self.is_domain()),
            class: OnceCell::new(),
        }
    }

    #[inline]
    pub fn number_of_references(&self) -> u32 {
        self.references.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn increment_references(&self) -> u32 {
        let old = self.references.fetch_add(1, Ordering::Relaxed);
        debug_assert!(old < u32::MAX, "refcount overflow");
        old + 1
    }

    /// Decrement and return the new count in one atomic step
    #[inline]
    pub(crate) fn decrement_references(&self) -> u32 {
        let old = self.references.fetch_sub(1, Ordering::Release);
        debug_assert!(old > 0, "refcount underflow");
        if old == 1 {
            // Synchronize with all previous decrements before destruction
            fence(Ordering::Acquire);
        }
        old - 1
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.write() = Some(name.to_string());
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.read().as_deref() == Some(name)
    }

    pub fn is_domain(&self) -> bool {
        self.domain.load(Ordering::Relaxed)
    }

    pub fn set_domain(&self, domain: bool) {
        self.domain.store(domain, Ordering::Relaxed);
    }

    pub fn class_registry_item(&self) -> Option<&Arc<ClassRegistryItem>> {
        self.class.get()
    }

    /// Attribute this object to `item`; only the first attribution counts
    pub(crate) fn attach_class(&self, item: Arc<ClassRegistryItem>) {
        let counted = Arc::clone(&item);
        if self.class.set(item).is_ok() {
            counted.increment_number_of_instances();
        }
    }
}

impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObjectBase {
    fn drop(&mut self) {
        if let Some(item) = self.class.get() {
            item.decrement_number_of_instances();
        }
    }
}

impl core::fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectBase")
            .field("name", &self.name())
            .field("references", &self.number_of_references())
            .field("class", &self.class.get().map(|item| item.class_name().to_string()))
            .finish()
    }
}

/// Plain object with no state beyond its header, registered as `Object`
#[derive(Debug, Default)]
pub struct BasicObject {
    base: ObjectBase,
}

impl BasicObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            base: ObjectBase::named(name),
        }
    }
}

impl Object for BasicObject {
    fn object_base(&self) -> &ObjectBase {
        &self.base
    }
}
