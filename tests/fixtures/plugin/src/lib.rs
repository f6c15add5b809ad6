//! Shared library publishing classes through the registration hook

use core::ffi::c_void;
use refcore::registry::ClassRegistryItem;
use refcore::{ClassRegistryDatabase, Object, ObjectBase};

#[derive(Default)]
pub struct Plugged {
    base: ObjectBase,
}

impl Object for Plugged {
    fn object_base(&self) -> &ObjectBase {
        &self.base
    }
}

#[derive(Default)]
pub struct PluggedAbstract {
    base: ObjectBase,
}

impl Object for PluggedAbstract {
    fn object_base(&self) -> &ObjectBase {
        &self.base
    }
}

/// Called by the database right after this library is opened
///
/// # Safety
/// `database` must be the pointer the loading database passed in.
#[no_mangle]
pub unsafe extern "C" fn refcore_register_classes(database: *const c_void) {
    if let Some(database) = ClassRegistryDatabase::from_raw(database) {
        database.add(ClassRegistryItem::new::<Plugged>("Plugged", "1.0"));
        database.add(ClassRegistryItem::abstract_class::<PluggedAbstract>("PluggedAbstract", "1.0"));
    }
}
