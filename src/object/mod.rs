//! Reference-counted object model
//!
//! Objects live in heap blocks obtained from an explicit `Heap` and are
//! shared through `Reference` handles. The count is an atomic field in each
//! object's `ObjectBase`; the handle that drops it from 1 to 0 destroys the
//! object and returns the block to the heap it came from.

mod base;
mod reference;
mod reference_t;


pub use base::{BasicObject, ObjectBase};
pub use reference::Reference;
pub use reference_t::ReferenceT;

use crate::container::ReferenceContainer;
use crate::registry::{ClassProperties, ClassRegistryDatabase, ClassRegistryItem};
use core::any::Any;
use std::sync::Arc;

/// Upcast helper so `dyn Object` can be downcast to its concrete type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Base capability of every managed object
pub trait Object: AsAny + Send + Sync {
    fn object_base(&self) -> &ObjectBase;

    /// Container view of this object, if it holds references
    fn as_container(&self) -> Option<&ReferenceContainer> {
        None
    }

    /// Drop references that could keep a cycle alive; anything that still
    /// needs purging is moved to `purge_list`
    fn purge(&self, _purge_list: &ReferenceContainer) {}
}

impl dyn Object {
    pub fn name(&self) -> Option<String> {
        self.object_base().name()
    }

    pub fn set_name(&self, name: &str) {
        self.object_base().set_name(name);
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.object_base().has_name(name)
    }

    pub fn is_domain(&self) -> bool {
        self.object_base().is_domain()
    }

    pub fn set_domain(&self, domain: bool) {
        self.object_base().set_domain(domain);
    }

    pub fn number_of_references(&self) -> u32 {
        self.object_base().number_of_references()
    }

    pub fn class_registry_item(&self) -> Option<&Arc<ClassRegistryItem>> {
        self.object_base().class_registry_item()
    }

    pub fn class_properties(&self) -> Option<&ClassProperties> {
        self.class_registry_item().map(|item| item.class_properties())
    }

    /// Name that stays distinct across objects sharing the same name:
    /// `x<ADDRESS>::<name>`
    pub fn unique_name(&self) -> String {
        let address = self as *const dyn Object as *const () as usize;
        let name = self.name().unwrap_or_default();
        format!("x{:X}::{}", address, name)
    }

    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    pub fn is<T: Object>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Register the classes defined by this module
pub fn register(database: &ClassRegistryDatabase) {
    database.add(ClassRegistryItem::new::<BasicObject>("Object", "1.0"));
}
