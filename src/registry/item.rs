//! Registry entry for one class: metadata, factory and live-instance count

use super::library::LoadableLibrary;
use super::properties::ClassProperties;
use crate::heap::Heap;
use crate::object::{Object, Reference};
use core::any::TypeId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Factory building a new instance of a class on the given heap
///
/// Receives the item it is registered under so the new object can be
/// attributed to it.
pub type ObjectBuildFn = fn(&Arc<ClassRegistryItem>, &Arc<dyn Heap>) -> Option<Reference>;

/// Factory for any default-constructible object type
pub fn build_default<T: Object + Default>(
    item: &Arc<ClassRegistryItem>,
    heap: &Arc<dyn Heap>,
) -> Option<Reference> {
    let reference = Reference::with_class(T::default(), heap, Some(Arc::clone(item)));
    reference.is_valid().then_some(reference)
}

pub struct ClassRegistryItem {
    properties: ClassProperties,
    type_id: Option<TypeId>,
    instances: AtomicU32,
    library: RwLock<Option<Weak<LoadableLibrary>>>,
    builder: RwLock<Option<ObjectBuildFn>>,
}

impl ClassRegistryItem {
    /// Item for a concrete class buildable by name
    pub fn new<T: Object + Default>(name: &str, version: &str) -> Arc<Self> {
        Self::with_properties(
            ClassProperties::of::<T>(name, version),
            Some(TypeId::of::<T>()),
            Some(build_default::<T> as ObjectBuildFn),
        )
    }

    /// Item for a class that is described but cannot be built by name
    pub fn abstract_class<T: Object>(name: &str, version: &str) -> Arc<Self> {
        Self::with_properties(
            ClassProperties::of::<T>(name, version),
            Some(TypeId::of::<T>()),
            None,
        )
    }

    pub fn with_properties(
        properties: ClassProperties,
        type_id: Option<TypeId>,
        builder: Option<ObjectBuildFn>,
    ) -> Arc<Self> {
        Arc::new(Self {
            properties,
            type_id,
            instances: AtomicU32::new(0),
            library: RwLock::new(None),
            builder: RwLock::new(builder),
        })
    }

    #[inline]
    pub fn class_properties(&self) -> &ClassProperties {
        &self.properties
    }

    #[inline]
    pub fn class_name(&self) -> &str {
        self.properties.name()
    }

    #[inline]
    pub fn typeid_name(&self) -> &'static str {
        self.properties.typeid_name()
    }

    #[inline]
    pub fn class_version(&self) -> &str {
        self.properties.version()
    }

    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    pub fn number_of_instances(&self) -> u32 {
        self.instances.load(Ordering::Acquire)
    }

    pub fn increment_number_of_instances(&self) {
        self.instances.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decrement_number_of_instances(&self) {
        // Saturate rather than wrap if a caller decrements an idle class
        let _ = self
            .instances
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Library this class was loaded from, while it is still mapped
    pub fn loadable_library(&self) -> Option<Arc<LoadableLibrary>> {
        self.library.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_loadable_library(&self, library: &Arc<LoadableLibrary>) {
        *self.library.write() = Some(Arc::downgrade(library));
    }

    pub fn object_builder(&self) -> Option<ObjectBuildFn> {
        *self.builder.read()
    }

    pub fn set_object_builder(&self, builder: Option<ObjectBuildFn>) {
        *self.builder.write() = builder;
    }
}

impl core::fmt::Debug for ClassRegistryItem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassRegistryItem")
            .field("name", &self.class_name())
            .field("version", &self.class_version())
            .field("unique_id", &self.properties.unique_id())
            .field("instances", &self.number_of_instances())
            .finish()
    }
}
