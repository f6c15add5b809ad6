//! Heap abstraction used to place objects
//!
//! Every object is allocated through an explicit `Heap` chosen by the caller
//! and is released back to that same heap when its last reference goes away.
//! `StandardHeap` forwards to the global allocator and keeps usage counters;
//! an optional byte limit makes allocation failure reproducible.


use crate::logging::{trace, warn};
use core::alloc::Layout;
use core::ptr::NonNull;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Raw memory provider for objects
///
/// Implementations must be shareable across threads: a reference created
/// on one thread may release its object on another.
///
/// # Safety
/// A block returned by `malloc(layout)` must be valid for reads and writes
/// of `layout.size()` bytes, aligned to `layout.align()`, and not handed out
/// again until it is passed back to `free`. Objects are written into these
/// blocks without further checks beyond alignment.
pub unsafe trait Heap: Send + Sync {
    /// Human readable identifier used in diagnostics
    fn name(&self) -> &str;

    /// Allocate a block for `layout`, or `None` when the heap cannot serve it
    fn malloc(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block obtained from `malloc` on this same heap
    ///
    /// # Safety
    /// `ptr` must come from `self.malloc(layout)` with an identical layout
    /// and must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Heap backed by the process global allocator
pub struct StandardHeap {
    name: String,
    limit: Option<usize>,
    allocations: AtomicUsize,
    frees: AtomicUsize,
    bytes_in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl StandardHeap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            limit: None,
            allocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            bytes_in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Heap that refuses requests once `limit` bytes are outstanding
    pub fn with_limit(name: impl Into<String>, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(name)
        }
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            bytes_in_use: self.bytes_in_use.load(Ordering::Relaxed),
            peak: self.peak.load(Ordering::Relaxed),
        }
    }

    fn reserve(&self, size: usize) -> bool {
        let limit = self.limit.unwrap_or(usize::MAX);
        let reserved = self
            .bytes_in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size).filter(|total| *total <= limit)
            });
        match reserved {
            Ok(previous) => {
                self.peak.fetch_max(previous + size, Ordering::Relaxed);
                true
            }
            Err(used) => {
                warn!(
                    event = "heap_limit_reached",
                    heap = %self.name,
                    requested = size,
                    in_use = used,
                    limit = limit
                );
                false
            }
        }
    }
}

// SAFETY: blocks come straight from the global allocator for `layout`
unsafe impl Heap for StandardHeap {
    fn name(&self) -> &str {
        &self.name
    }

    fn malloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 || !self.reserve(layout.size()) {
            return None;
        }

        // SAFETY: layout has a non-zero size
        let ptr = NonNull::new(unsafe { std::alloc::alloc(layout) });
        match ptr {
            Some(block) => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                trace!(event = "heap_malloc", heap = %self.name, size = layout.size(), address = ?block.as_ptr());
            }
            None => {
                self.bytes_in_use.fetch_sub(layout.size(), Ordering::AcqRel);
            }
        }
        ptr
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        trace!(event = "heap_free", heap = %self.name, size = layout.size(), address = ?ptr.as_ptr());
        std::alloc::dealloc(ptr.as_ptr(), layout);
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.bytes_in_use.fetch_sub(layout.size(), Ordering::AcqRel);
    }
}

/// Usage counters for a `StandardHeap`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub allocations: usize,
    pub frees: usize,
    pub bytes_in_use: usize,
    pub peak: usize,
}

static STANDARD_HEAP: Lazy<Arc<StandardHeap>> = Lazy::new(|| Arc::new(StandardHeap::new("standard")));

/// Process-wide default heap
pub fn standard_heap() -> Arc<dyn Heap> {
    STANDARD_HEAP.clone()
}

/// Counters of the process-wide default heap
pub fn standard_heap_stats() -> HeapStats {
    STANDARD_HEAP.stats()
}
