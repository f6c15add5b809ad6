//! Class registry - construction of objects by class name
//!
//! A `ClassRegistryItem` describes one class and carries its factory; the
//! `ClassRegistryDatabase` keeps the active items and resolves
//! `library::Class` names by loading shared libraries on demand.

mod database;
mod item;
mod library;
mod properties;


pub use database::{split_class_name, ClassRegistryDatabase, LibrarySearch, LIBRARY_SEPARATOR};
pub use item::{build_default, ClassRegistryItem, ObjectBuildFn};
pub use library::{LoadError, LoadableLibrary, SymbolError, DLL_EXTENSIONS, REGISTER_SYMBOL};
pub use properties::ClassProperties;

/// Register every class this crate provides
pub fn register_builtins(database: &ClassRegistryDatabase) {
    crate::object::register(database);
    crate::container::register(database);
}
