//! Class table keyed by name, with dynamic-library fallback
//!
//! Classes are registered explicitly: each module exposes a `register`
//! function that adds its items, the global `instance()` runs the builtin
//! ones on first use, and shared libraries export `REGISTER_SYMBOL` which is
//! invoked right after they are opened.
//!
//! Loaded libraries are owned by the database's library table and stay
//! mapped for its whole lifetime, whether or not the class that triggered
//! the load was found in them. Items only keep a weak handle.

use super::item::ClassRegistryItem;
use super::library::{LoadError, LoadableLibrary, DLL_EXTENSIONS, REGISTER_SYMBOL};
use crate::heap::Heap;
use crate::list::{Link, LinkedListHolder, LinkedListable};
use crate::logging::{self, debug};
use crate::object::Reference;
use core::any::TypeId;
use core::ffi::c_void;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Separator between library and class in a qualified class name
pub const LIBRARY_SEPARATOR: &str = "::";

type RegisterClassesFn = unsafe extern "C" fn(*const c_void);

static INSTANCE: Lazy<ClassRegistryDatabase> = Lazy::new(|| {
    let database = ClassRegistryDatabase::new();
    super::register_builtins(&database);
    database
});

struct RegistryEntry {
    link: Link<RegistryEntry>,
    item: Arc<ClassRegistryItem>,
}

impl LinkedListable for RegistryEntry {
    fn link(&self) -> &Link<Self> {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link<Self> {
        &mut self.link
    }
}

/// Where and how shared libraries are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySearch {
    /// Directories searched in order; empty defers to the platform loader path
    pub paths: Vec<PathBuf>,
    /// File extensions appended to the library name, in order
    pub extensions: Vec<String>,
}

impl Default for LibrarySearch {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            extensions: DLL_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl LibrarySearch {
    /// Candidate files for `library`, in search order
    pub fn candidates(&self, library: &str) -> Vec<PathBuf> {
        let file_names: Vec<String> = self
            .extensions
            .iter()
            .map(|ext| format!("{}{}", library, ext))
            .collect();

        if self.paths.is_empty() {
            return file_names.into_iter().map(PathBuf::from).collect();
        }

        self.paths
            .iter()
            .flat_map(|dir| file_names.iter().map(move |file| dir.join(file)))
            .collect()
    }
}

pub struct ClassRegistryDatabase {
    entries: RwLock<LinkedListHolder<RegistryEntry>>,
    next_unique_id: AtomicU32,
    libraries: DashMap<String, Arc<LoadableLibrary>>,
    search: RwLock<LibrarySearch>,
}

impl ClassRegistryDatabase {
    /// Empty database without builtin classes
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(LinkedListHolder::new()),
            next_unique_id: AtomicU32::new(1),
            libraries: DashMap::new(),
            search: RwLock::new(LibrarySearch::default()),
        }
    }

    /// Process-wide database, bootstrapped with the builtin classes
    pub fn instance() -> &'static ClassRegistryDatabase {
        &INSTANCE
    }

    /// Recover the database handed to a library's registration hook
    ///
    /// # Safety
    /// `database` must be the pointer passed to `REGISTER_SYMBOL` during the
    /// current load, or null.
    pub unsafe fn from_raw<'a>(database: *const c_void) -> Option<&'a ClassRegistryDatabase> {
        (database as *const ClassRegistryDatabase).as_ref()
    }

    /// Register `item`, replacing any item with the same class name
    ///
    /// The replaced item is only unlinked: objects built from it keep their
    /// handle and its instance count stays accurate.
    pub fn add(&self, item: Arc<ClassRegistryItem>) {
        let evicted = {
            let mut entries = self.entries.write();
            let name = item.class_name();
            let evicted =
                entries.list_extract_by(&mut |entry: &RegistryEntry| entry.item.class_name() == name);

            let properties = item.class_properties();
            if properties.unique_id() == 0 {
                properties.set_unique_id(self.next_unique_id.fetch_add(1, Ordering::Relaxed));
            }

            let _ = entries.list_add(Box::new(RegistryEntry {
                link: Link::new(),
                item: Arc::clone(&item),
            }));
            evicted
        };

        if let Some(old) = evicted {
            logging::log_class_evicted(old.item.class_name(), old.item.class_version());
        }
        logging::log_class_registered(
            item.class_name(),
            item.class_version(),
            item.class_properties().unique_id(),
        );
    }

    /// Look up a class by name, loading `library` for `library::Class`
    /// names that are not registered yet
    pub fn find(&self, class_name: &str) -> Option<Arc<ClassRegistryItem>> {
        let (library, name) = split_class_name(class_name);
        if let Some(item) = self.find_local(name) {
            return Some(item);
        }

        let library = library?;
        match self.load_library(library) {
            Ok(loaded) => {
                let item = self.find_local(name)?;
                item.set_loadable_library(&loaded);
                Some(item)
            }
            Err(err) => {
                logging::log_library_failed(library, &err.to_string());
                None
            }
        }
    }

    /// Look up the item registered for the Rust type `type_id`
    pub fn find_type_id(&self, type_id: TypeId) -> Option<Arc<ClassRegistryItem>> {
        self.entries
            .read()
            .list_search_by(&mut |entry: &RegistryEntry| entry.item.type_id() == Some(type_id))
            .map(|entry| Arc::clone(&entry.item))
    }

    pub fn find_type<T: 'static>(&self) -> Option<Arc<ClassRegistryItem>> {
        self.find_type_id(TypeId::of::<T>())
    }

    /// Look up an item by its compiler-provided type name
    pub fn find_type_id_name(&self, typeid_name: &str) -> Option<Arc<ClassRegistryItem>> {
        self.entries
            .read()
            .list_search_by(&mut |entry: &RegistryEntry| entry.item.typeid_name() == typeid_name)
            .map(|entry| Arc::clone(&entry.item))
    }

    /// Build a new object of class `class_name` on `heap`
    pub fn create_by_name(&self, class_name: &str, heap: &Arc<dyn Heap>) -> Option<Reference> {
        let item = self.find(class_name)?;
        let Some(build) = item.object_builder() else {
            debug!(event = "class_not_buildable", class = class_name);
            return None;
        };

        let reference = build(&item, heap)?;
        reference.is_valid().then_some(reference)
    }

    /// Number of active classes
    pub fn size(&self) -> u32 {
        self.entries.read().list_size()
    }

    /// Item at registration position `index`
    pub fn peek(&self, index: u32) -> Option<Arc<ClassRegistryItem>> {
        self.entries
            .read()
            .list_peek(index)
            .map(|entry| Arc::clone(&entry.item))
    }

    /// Snapshot of the active items in registration order
    pub fn items(&self) -> Vec<Arc<ClassRegistryItem>> {
        self.entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.item))
            .collect()
    }

    /// Unregister `item`; returns false if it was not active
    pub fn delete(&self, item: &Arc<ClassRegistryItem>) -> bool {
        self.entries
            .write()
            .list_delete_by(&mut |entry: &RegistryEntry| Arc::ptr_eq(&entry.item, item))
    }

    /// Names of the libraries opened by this database
    pub fn libraries(&self) -> Vec<String> {
        self.libraries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn library_search(&self) -> LibrarySearch {
        self.search.read().clone()
    }

    pub fn configure_libraries(&self, search: LibrarySearch) {
        *self.search.write() = search;
    }

    /// Open `library` (once) and run its registration hook
    pub fn load_library(&self, library: &str) -> Result<Arc<LoadableLibrary>, LoadError> {
        if library.is_empty() {
            return Err(LoadError::InvalidName);
        }
        if let Some(loaded) = self.libraries.get(library) {
            return Ok(Arc::clone(loaded.value()));
        }

        let candidates = self.search.read().candidates(library);
        let mut opened = None;
        for candidate in &candidates {
            match LoadableLibrary::open(candidate) {
                Ok(handle) => {
                    opened = Some(handle);
                    break;
                }
                Err(err) => {
                    debug!(event = "library_candidate_failed", path = %candidate.display(), error = %err);
                }
            }
        }

        let loaded = Arc::new(opened.ok_or_else(|| LoadError::NotFound {
            library: library.to_string(),
            tried: candidates,
        })?);
        logging::log_library_loaded(library, loaded.path());

        // No table or list lock is held here: the hook calls back into `add`
        self.run_register_hook(&loaded);

        let stored = self
            .libraries
            .entry(library.to_string())
            .or_insert(loaded);
        Ok(Arc::clone(stored.value()))
    }

    fn run_register_hook(&self, library: &LoadableLibrary) {
        match library.symbol(REGISTER_SYMBOL) {
            Ok(symbol) => unsafe {
                let register =
                    core::mem::transmute::<*mut c_void, RegisterClassesFn>(symbol.as_ptr());
                register(self as *const ClassRegistryDatabase as *const c_void);
            },
            Err(_) => {
                debug!(event = "library_without_register_hook", path = %library.path().display());
            }
        }
    }

    fn find_local(&self, name: &str) -> Option<Arc<ClassRegistryItem>> {
        self.entries
            .read()
            .list_search_by(&mut |entry: &RegistryEntry| entry.item.class_name() == name)
            .map(|entry| Arc::clone(&entry.item))
    }
}

impl Default for ClassRegistryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `library::Class` into its parts; an empty library part is ignored
pub fn split_class_name(class_name: &str) -> (Option<&str>, &str) {
    match class_name.split_once(LIBRARY_SEPARATOR) {
        Some((library, name)) if !library.is_empty() => (Some(library), name),
        Some((_, name)) => (None, name),
        None => (None, class_name),
    }
}
