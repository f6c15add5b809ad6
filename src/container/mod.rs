//! Hierarchical containers of references with filtered recursive search
//!
//! A `ReferenceContainer` is itself an `Object`, so containers nest into
//! trees (or DAGs, when the same object is inserted in several places).
//! Each container guards its list with its own mutex, taken with the
//! container's timeout. `find` never holds that mutex while testing a
//! candidate, while writing into the result container, or while descending
//! into a child, so lock order across containers is never an issue.

mod filter;
mod filter_object_name;
mod filter_references;
mod node;

#[cfg(test)]
mod tests;

pub use filter::{FilterMode, FilterState, ReferenceContainerFilter};
pub use filter_object_name::ReferenceContainerFilterObjectName;
pub use filter_references::ReferenceContainerFilterReferences;
pub use node::ReferenceContainerNode;

use crate::list::{LinkedListHolder, LinkedListable};
use crate::logging::{self, warn};
use crate::object::{Object, ObjectBase, Reference};
use crate::registry::{ClassRegistryDatabase, ClassRegistryItem};
use filter_object_name::parse_path;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const INFINITE_MS: u64 = u64::MAX;

static DEFAULT_TIMEOUT_MS: AtomicU64 = AtomicU64::new(INFINITE_MS);

/// Lock timeout given to containers created from now on; `None` waits forever
pub fn set_default_timeout(timeout: Option<Duration>) {
    let ms = timeout.map_or(INFINITE_MS, |t| t.as_millis().min(u128::from(INFINITE_MS - 1)) as u64);
    DEFAULT_TIMEOUT_MS.store(ms, Ordering::Relaxed);
}

pub fn default_timeout() -> Option<Duration> {
    match DEFAULT_TIMEOUT_MS.load(Ordering::Relaxed) {
        INFINITE_MS => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

/// Container operation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The reference to insert does not point to an object
    InvalidReference,
    /// The container lock was not acquired within its timeout
    LockTimeout,
    /// A path segment names an existing object that is not a container
    NotAContainer { segment: String },
    /// The path is empty or has an empty segment
    InvalidPath { path: String },
}

impl core::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidReference => write!(f, "Cannot insert an invalid reference"),
            Self::LockTimeout => write!(f, "Container lock timed out"),
            Self::NotAContainer { segment } => {
                write!(f, "Path segment '{}' is not a container", segment)
            }
            Self::InvalidPath { path } => write!(f, "Invalid path '{}'", path),
        }
    }
}

impl std::error::Error for ContainerError {}

type NodeList = LinkedListHolder<ReferenceContainerNode>;

/// Ordered collection of references
pub struct ReferenceContainer {
    base: ObjectBase,
    list: Mutex<NodeList>,
    timeout: RwLock<Option<Duration>>,
}

impl ReferenceContainer {
    pub fn new() -> Self {
        Self::with_base(ObjectBase::new())
    }

    pub fn named(name: &str) -> Self {
        Self::with_base(ObjectBase::named(name))
    }

    fn with_base(base: ObjectBase) -> Self {
        Self {
            base,
            list: Mutex::new(LinkedListHolder::new()),
            timeout: RwLock::new(default_timeout()),
        }
    }

    /// Lock wait limit; `None` is infinite
    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.read()
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.write() = timeout;
    }

    fn lock(&self) -> Option<MutexGuard<'_, NodeList>> {
        let timeout = self.timeout();
        let guard = match timeout {
            None => Some(self.list.lock()),
            Some(limit) => self.list.try_lock_for(limit),
        };
        if guard.is_none() {
            let name = self.base.name().unwrap_or_default();
            logging::log_lock_timeout(&name, timeout.map_or(0, |t| t.as_millis()));
        }
        guard
    }

    /// Number of direct children (0 if the lock times out)
    pub fn size(&self) -> u32 {
        self.lock().map_or(0, |list| list.list_size())
    }

    /// Child at `index`
    pub fn get(&self, index: u32) -> Option<Reference> {
        let list = self.lock()?;
        let child = list.list_peek(index).map(|node| node.reference().clone());
        if child.is_none() {
            warn!(
                event = "container_index_out_of_range",
                index = index,
                size = list.list_size()
            );
        }
        child
    }

    /// Snapshot of the direct children in order
    pub fn references(&self) -> Vec<Reference> {
        self.lock()
            .map(|list| list.iter().map(|node| node.reference().clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_container(&self, reference: &Reference) -> bool {
        reference.is_container()
    }

    /// Append a child
    pub fn insert(&self, reference: impl Into<Reference>) -> Result<(), ContainerError> {
        self.insert_node(reference.into(), None)
    }

    /// Insert a child before position `index`, clamped to the end
    pub fn insert_at(&self, reference: impl Into<Reference>, index: u32) -> Result<(), ContainerError> {
        self.insert_node(reference.into(), Some(index))
    }

    fn insert_node(&self, reference: Reference, index: Option<u32>) -> Result<(), ContainerError> {
        if !reference.is_valid() {
            warn!(event = "container_insert_invalid", "Refusing to insert an invalid reference");
            return Err(ContainerError::InvalidReference);
        }

        let node = Box::new(ReferenceContainerNode::new(reference));
        let mut list = self.lock().ok_or(ContainerError::LockTimeout)?;
        match index {
            None => {
                let _ = list.list_add(node);
            }
            Some(index) => list.list_insert_at(node, index),
        }
        Ok(())
    }

    /// Insert `reference` at a dotted `path` below this container
    ///
    /// Leading segments select existing child containers by name or create
    /// new `ReferenceContainer`s; the last segment becomes the name of
    /// `reference`, which is appended to the innermost container. The name
    /// is only changed once the insertion can no longer fail.
    pub fn insert_path(&self, path: &str, reference: impl Into<Reference>) -> Result<(), ContainerError> {
        let reference = reference.into();
        if !reference.is_valid() {
            return Err(ContainerError::InvalidReference);
        }
        if path.is_empty() {
            return self.insert(reference);
        }

        let segments = parse_path(path).ok_or_else(|| ContainerError::InvalidPath {
            path: path.to_string(),
        })?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(ContainerError::InvalidPath {
                path: path.to_string(),
            });
        };

        let mut anchor: Option<Reference> = None;
        for segment in parents {
            let next = match anchor.as_ref() {
                None => self.child_container(segment)?,
                Some(current) => Self::container_of(current, segment)?.child_container(segment)?,
            };
            anchor = Some(next);
        }

        match anchor.as_ref() {
            None => self.insert_named(reference, name),
            Some(current) => Self::container_of(current, name)?.insert_named(reference, name),
        }
    }

    fn container_of<'a>(reference: &'a Reference, segment: &str) -> Result<&'a ReferenceContainer, ContainerError> {
        reference.as_container().ok_or_else(|| ContainerError::NotAContainer {
            segment: segment.to_string(),
        })
    }

    /// Child container named `segment`, created if absent, in one critical section
    fn child_container(&self, segment: &str) -> Result<Reference, ContainerError> {
        let mut list = self.lock().ok_or(ContainerError::LockTimeout)?;
        let existing = list
            .list_search_by(&mut |node: &ReferenceContainerNode| {
                node.reference().get().map_or(false, |object| object.has_name(segment))
            })
            .map(|node| node.reference().clone());

        match existing {
            Some(child) if child.is_container() => Ok(child),
            Some(_) => Err(ContainerError::NotAContainer {
                segment: segment.to_string(),
            }),
            None => {
                let created = Reference::new(ReferenceContainer::named(segment));
                if !created.is_valid() {
                    return Err(ContainerError::InvalidReference);
                }
                let _ = list.list_add(Box::new(ReferenceContainerNode::new(created.clone())));
                Ok(created)
            }
        }
    }

    /// Append `reference` under `name`, renaming it only once the lock is held
    fn insert_named(&self, reference: Reference, name: &str) -> Result<(), ContainerError> {
        let mut list = self.lock().ok_or(ContainerError::LockTimeout)?;
        let Some(object) = reference.get() else {
            return Err(ContainerError::InvalidReference);
        };
        object.set_name(name);
        let _ = list.list_add(Box::new(ReferenceContainerNode::new(reference)));
        Ok(())
    }

    /// Remove the first direct child pointing to the same object as `reference`
    pub fn delete(&self, reference: &Reference) -> bool {
        let mut filter = ReferenceContainerFilterReferences::new(1, FilterMode::REMOVE, reference.clone());
        let result = ReferenceContainer::new();
        self.find(&result, &mut filter);
        result.size() > 0
    }

    /// Remove the first object found at `path`
    pub fn delete_path(&self, path: &str) -> bool {
        let mut filter = ReferenceContainerFilterObjectName::new(1, FilterMode::REMOVE, path);
        let result = ReferenceContainer::new();
        self.find(&result, &mut filter);
        result.size() > 0
    }

    /// First object named by `path`
    pub fn find_path(&self, path: &str, recursive: bool) -> Option<Reference> {
        let mode = if recursive {
            FilterMode::RECURSIVE
        } else {
            FilterMode::SHALLOW
        };
        let mut filter = ReferenceContainerFilterObjectName::new(1, mode, path);
        let result = ReferenceContainer::new();
        self.find(&result, &mut filter);
        result.size().checked_sub(1).and_then(|last| result.get(last))
    }

    /// Walk the children guided by `filter`, appending matches to `result`
    ///
    /// Returns how many entries this call (including nested calls) left in
    /// `result`. With `PATH` set, a container is stored before descending
    /// into it and taken out again when the descent contributed nothing.
    pub fn find(&self, result: &ReferenceContainer, filter: &mut dyn ReferenceContainerFilter) -> u32 {
        let Some(size) = self.lock().map(|list| list.list_size()) else {
            return 0;
        };
        if size == 0 {
            return 0;
        }

        let reverse = filter.is_reverse();
        let mut index: i64 = if reverse { i64::from(size) - 1 } else { 0 };
        let mut contributed = 0u32;

        while !filter.is_finished() {
            let Some(child) = self.child_at(index) else {
                break;
            };

            if filter.test(result, &child) && (filter.is_search_all() || filter.is_finished()) {
                match result.insert(&child) {
                    Ok(()) => {
                        contributed += 1;
                        if filter.is_remove() && self.remove_at(index, &child) && !reverse {
                            index -= 1;
                        }
                    }
                    Err(err) => {
                        warn!(event = "find_store_failed", error = %err);
                    }
                }
            }

            if filter.is_finished() {
                break;
            }

            if filter.is_recursive() {
                if let Some(container) = child.as_container() {
                    contributed += Self::descend(container, &child, result, filter);
                }
            }

            index += if reverse { -1 } else { 1 };
        }

        contributed
    }

    fn descend(
        container: &ReferenceContainer,
        child: &Reference,
        result: &ReferenceContainer,
        filter: &mut dyn ReferenceContainerFilter,
    ) -> u32 {
        let stored = filter.is_store_path() && result.insert(child).is_ok();
        let below = container.find(result, filter);
        if below > 0 {
            return below + u32::from(stored);
        }
        if stored {
            drop(result.remove_last());
        }
        0
    }

    fn child_at(&self, index: i64) -> Option<Reference> {
        let index = u32::try_from(index).ok()?;
        let list = self.lock()?;
        list.list_peek(index).map(|node| node.reference().clone())
    }

    /// Remove the node at `index` if it still holds `expected`
    fn remove_at(&self, index: i64, expected: &Reference) -> bool {
        let Ok(index) = u32::try_from(index) else {
            return false;
        };
        let removed = {
            let Some(mut list) = self.lock() else {
                return false;
            };
            let still_there = list
                .list_peek(index)
                .map_or(false, |node| node.reference() == expected);
            if still_there {
                list.list_extract_at(index)
            } else {
                None
            }
        };
        // Released outside the lock: the last reference may tear down a subtree
        removed.is_some()
    }

    fn remove_last(&self) -> Option<Box<ReferenceContainerNode>> {
        let mut list = self.lock()?;
        let last = list.list_size().checked_sub(1)?;
        list.list_extract_at(last)
    }

    /// Detach every child and return them in order
    pub(crate) fn take_all(&self) -> Vec<Reference> {
        let chain = self.lock().and_then(|mut list| list.reset());
        let mut children = Vec::new();
        let mut cursor = chain;
        while let Some(mut node) = cursor {
            cursor = node.link_mut().take();
            children.push(node.reference().clone());
        }
        children
    }

    /// Empty this tree, breaking shared ownership between its nodes
    pub fn purge(&self) {
        let purge_list = ReferenceContainer::new();
        self.purge_into(&purge_list);
    }

    /// Move every child into `purge_list`, then purge each moved child
    ///
    /// Iterates over the flattened list instead of recursing per level.
    pub fn purge_into(&self, purge_list: &ReferenceContainer) {
        let start = purge_list.size();
        for child in self.take_all() {
            if let Err(err) = purge_list.insert(child) {
                warn!(event = "purge_store_failed", error = %err);
            }
        }
        let end = purge_list.size();

        for index in start..end {
            if let Some(object) = purge_list.get(index) {
                if let Some(target) = object.get() {
                    target.purge(purge_list);
                }
            }
        }
    }

    /// New container with the same name, timeout and children
    pub fn duplicate(&self) -> ReferenceContainer {
        let copy = Self::with_base(self.base.duplicate());
        copy.set_timeout(self.timeout());
        for child in self.references() {
            if let Err(err) = copy.insert(child) {
                warn!(event = "duplicate_insert_failed", error = %err);
            }
        }
        copy
    }
}

impl Default for ReferenceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Object for ReferenceContainer {
    fn object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn as_container(&self) -> Option<&ReferenceContainer> {
        Some(self)
    }

    fn purge(&self, purge_list: &ReferenceContainer) {
        self.purge_into(purge_list);
    }
}

impl core::fmt::Debug for ReferenceContainer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReferenceContainer")
            .field("name", &self.base.name())
            .field("size", &self.size())
            .field("timeout", &self.timeout())
            .finish()
    }
}

/// Register the classes defined by this module
pub fn register(database: &ClassRegistryDatabase) {
    database.add(ClassRegistryItem::new::<ReferenceContainer>("ReferenceContainer", "1.0"));
}
