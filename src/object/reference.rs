//! Shared-ownership handle to a heap-placed object

use super::Object;
use crate::container::ReferenceContainer;
use crate::heap::{standard_heap, Heap};
use crate::logging::{self, debug, warn};
use crate::registry::{ClassRegistryDatabase, ClassRegistryItem};
use core::alloc::Layout;
use core::any::TypeId;
use core::ptr::{self, NonNull};
use std::sync::Arc;

/// Heap block holding an object and the heap it must be returned to
pub(crate) struct ObjectBox<T: ?Sized> {
    heap: Arc<dyn Heap>,
    object: T,
}

/// Counted handle to an `Object`
///
/// Every valid handle accounts for exactly one unit of the object's
/// reference count. Cloning adds one, dropping or `remove_reference`
/// releases one, and the release that reaches zero destroys the object.
/// Equality is identity of the referenced object.
pub struct Reference {
    ptr: Option<NonNull<ObjectBox<dyn Object>>>,
}

impl Reference {
    pub const fn invalid() -> Self {
        Self { ptr: None }
    }

    /// Place `object` on the standard heap
    pub fn new<T: Object>(object: T) -> Self {
        Self::new_in(object, &standard_heap())
    }

    /// Place `object` on `heap`, attributing it to the class registered for `T`
    pub fn new_in<T: Object>(object: T, heap: &Arc<dyn Heap>) -> Self {
        let class = ClassRegistryDatabase::instance().find_type_id(TypeId::of::<T>());
        Self::with_class(object, heap, class)
    }

    /// Place `object` on `heap`, attributing it to `class`
    ///
    /// Yields an invalid reference if the heap refuses the allocation.
    pub fn with_class<T: Object>(
        object: T,
        heap: &Arc<dyn Heap>,
        class: Option<Arc<ClassRegistryItem>>,
    ) -> Self {
        let layout = Layout::new::<ObjectBox<T>>();
        let Some(block) = heap.malloc(layout) else {
            debug!(
                event = "object_allocation_failed",
                heap = heap.name(),
                size = layout.size(),
                class = core::any::type_name::<T>()
            );
            return Self::invalid();
        };
        if block.as_ptr() as usize % layout.align() != 0 {
            warn!(
                event = "heap_misaligned_block",
                heap = heap.name(),
                align = layout.align(),
                address = ?block.as_ptr()
            );
            // SAFETY: the block came from this heap's `malloc(layout)` and was never used
            unsafe { heap.free(block, layout) };
            return Self::invalid();
        }

        let typed = block.cast::<ObjectBox<T>>();
        // SAFETY: block is fresh and aligned (checked above); `Heap` guarantees its size
        unsafe {
            typed.as_ptr().write(ObjectBox {
                heap: Arc::clone(heap),
                object,
            });
        }
        let ptr: NonNull<ObjectBox<dyn Object>> = typed;

        // SAFETY: just initialized and not yet shared
        let object: &dyn Object = unsafe { &(*ptr.as_ptr()).object };
        if let Some(item) = class {
            object.object_base().attach_class(item);
        }
        object.object_base().increment_references();

        let class_name = object
            .class_registry_item()
            .map_or(core::any::type_name::<T>(), |item| item.class_name());
        logging::log_object_created(class_name, heap.name(), object as *const dyn Object as *const ());

        Self { ptr: Some(ptr) }
    }

    /// Build an object by class name on the standard heap
    pub fn from_class_name(class_name: &str) -> Self {
        Self::from_class_name_in(class_name, &standard_heap())
    }

    /// Build an object by class name on `heap`; invalid if the class is
    /// unknown or cannot be built
    pub fn from_class_name_in(class_name: &str, heap: &Arc<dyn Heap>) -> Self {
        ClassRegistryDatabase::instance()
            .create_by_name(class_name, heap)
            .unwrap_or_default()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.ptr.is_some()
    }

    #[inline]
    pub fn get(&self) -> Option<&dyn Object> {
        // SAFETY: a valid handle keeps the object alive
        self.ptr.map(|ptr| unsafe { &(*ptr.as_ptr()).object })
    }

    /// Heap the object was placed on
    pub fn heap(&self) -> Option<&Arc<dyn Heap>> {
        // SAFETY: a valid handle keeps the box and its heap field alive
        self.ptr.map(|ptr| unsafe { &(*ptr.as_ptr()).heap })
    }

    pub fn number_of_references(&self) -> u32 {
        self.get().map_or(0, |object| object.number_of_references())
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.get()?.downcast_ref::<T>()
    }

    pub fn as_container(&self) -> Option<&ReferenceContainer> {
        self.get()?.as_container()
    }

    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    /// Address of the referenced object, null when invalid
    #[inline]
    pub fn as_ptr(&self) -> *const () {
        self.get()
            .map_or(ptr::null(), |object| object as *const dyn Object as *const ())
    }

    /// Release this handle's share and become invalid
    pub fn remove_reference(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };

        // SAFETY: this handle owned one unit of the count until now
        unsafe {
            if (*ptr.as_ptr()).object.object_base().decrement_references() == 0 {
                Self::destroy(ptr);
            }
        }
    }

    #[cold]
    unsafe fn destroy(ptr: NonNull<ObjectBox<dyn Object>>) {
        let raw = ptr.as_ptr();
        let layout = Layout::for_value(&*raw);
        let object: &dyn Object = &(*raw).object;
        let address = object as *const dyn Object as *const ();
        if let Some(item) = object.class_registry_item() {
            logging::log_object_destroyed(item.class_name(), address);
        }

        let heap = ptr::read(&(*raw).heap);
        ptr::drop_in_place(&mut (*raw).object);
        heap.free(ptr.cast::<u8>(), layout);
    }
}

impl Default for Reference {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Clone for Reference {
    fn clone(&self) -> Self {
        if let Some(object) = self.get() {
            object.object_base().increment_references();
        }
        Self { ptr: self.ptr }
    }
}

impl Drop for Reference {
    fn drop(&mut self) {
        self.remove_reference();
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl Eq for Reference {}

impl From<&Reference> for Reference {
    fn from(reference: &Reference) -> Self {
        reference.clone()
    }
}

impl core::fmt::Debug for Reference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.get() {
            Some(object) => f
                .debug_struct("Reference")
                .field("address", &self.as_ptr())
                .field("name", &object.name())
                .field("references", &object.number_of_references())
                .finish(),
            None => f.write_str("Reference(invalid)"),
        }
    }
}

// Objects are Send + Sync and the count is atomic
unsafe impl Send for Reference {}
unsafe impl Sync for Reference {}
