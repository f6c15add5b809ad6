//! List owner with a sentinel head and cached element count

use super::filters::{ListVisitor, SearchFilter, SortFilter};
use super::link::{Iter, Link, LinkedListable};

/// Owns a chain of nodes behind a fixed sentinel
///
/// `list_size` is kept in step with every mutation made through the holder,
/// so it always equals the number of nodes reachable from the sentinel.
pub struct LinkedListHolder<T: LinkedListable> {
    root: Link<T>,
    size: u32,
}

impl<T: LinkedListable> LinkedListHolder<T> {
    pub const fn new() -> Self {
        Self {
            root: Link::new(),
            size: 0,
        }
    }

    /// Drop every element
    pub fn clean_up(&mut self) {
        drop(self.root.take());
        self.size = 0;
    }

    /// Detach every element and hand the chain to the caller
    #[must_use = "the detached chain is dropped if ignored"]
    pub fn reset(&mut self) -> Option<Box<T>> {
        self.size = 0;
        self.root.take()
    }

    /// First element, if any
    #[inline]
    pub fn list(&self) -> Option<&T> {
        self.root.next()
    }

    #[inline]
    pub fn list_mut(&mut self) -> Option<&mut T> {
        self.root.next_mut()
    }

    #[inline]
    pub fn list_size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.root.iter()
    }

    /// Push a single node at the front, severing anything chained to it
    #[must_use = "the severed trailing chain is dropped if ignored"]
    pub fn fast_list_insert_single(&mut self, mut node: Box<T>) -> Option<Box<T>> {
        let severed = node.link_mut().take();
        let rest = self.root.take();
        node.link_mut().replace(rest);
        self.root.replace(Some(node));
        self.size += 1;
        severed
    }

    /// Insert a node chain at the front
    pub fn list_insert(&mut self, chain: Box<T>) {
        self.size += chain.size();
        self.root.insert(chain);
    }

    /// Insert a node chain in the order given by `sorter`
    pub fn list_insert_sorted<S>(&mut self, chain: Box<T>, sorter: &mut S)
    where
        S: SortFilter<T> + ?Sized,
    {
        self.size += chain.size();
        self.root.insert_sorted(chain, Some(sorter));
    }

    /// Insert a node chain before position `index`, clamped to the end
    pub fn list_insert_at(&mut self, chain: Box<T>, index: u32) {
        self.size += chain.size();
        self.root.link_at(index).insert(chain);
    }

    /// Move every element of `other` to the front of this list
    pub fn list_insert_l(&mut self, other: &mut LinkedListHolder<T>) {
        if let Some(chain) = other.reset() {
            self.list_insert(chain);
        }
    }

    /// Move every element of `other` into this list in sorted order
    pub fn list_insert_l_sorted<S>(&mut self, other: &mut LinkedListHolder<T>, sorter: &mut S)
    where
        S: SortFilter<T> + ?Sized,
    {
        if let Some(chain) = other.reset() {
            self.list_insert_sorted(chain, sorter);
        }
    }

    /// Move every element of `other` before position `index`
    pub fn list_insert_l_at(&mut self, other: &mut LinkedListHolder<T>, index: u32) {
        if let Some(chain) = other.reset() {
            self.list_insert_at(chain, index);
        }
    }

    /// Append a single node at the tail
    #[must_use = "the severed trailing chain is dropped if ignored"]
    pub fn list_add(&mut self, node: Box<T>) -> Option<Box<T>> {
        self.size += 1;
        self.root.add(node)
    }

    /// Append a node chain at the tail
    pub fn list_add_l(&mut self, chain: Box<T>) {
        self.size += chain.size();
        self.root.add_l(chain);
    }

    pub fn list_search(&self, node: *const T) -> bool {
        self.root.contains(node)
    }

    pub fn list_search_by<F>(&self, filter: &mut F) -> Option<&T>
    where
        F: SearchFilter<T> + ?Sized,
    {
        self.root.find_by(filter)
    }

    pub fn list_extract(&mut self, node: *const T) -> Option<Box<T>> {
        let extracted = self.root.extract(node);
        self.account_removed(extracted.is_some());
        extracted
    }

    pub fn list_extract_by<F>(&mut self, filter: &mut F) -> Option<Box<T>>
    where
        F: SearchFilter<T> + ?Sized,
    {
        let extracted = self.root.extract_by(filter);
        self.account_removed(extracted.is_some());
        extracted
    }

    /// Unlink the element at zero-based `index`
    pub fn list_extract_at(&mut self, index: u32) -> Option<Box<T>> {
        if index >= self.size {
            return None;
        }
        let extracted = self.root.link_at(index).unlink_next();
        self.account_removed(extracted.is_some());
        extracted
    }

    pub fn list_delete(&mut self, node: *const T) -> bool {
        self.list_extract(node).is_some()
    }

    /// Delete every element accepted by `filter`
    pub fn list_delete_by<F>(&mut self, filter: &mut F) -> bool
    where
        F: SearchFilter<T> + ?Sized,
    {
        let deleted = self.root.delete_by(filter);
        self.size -= deleted;
        deleted > 0
    }

    /// Delete every element accepted by `filter`, rescanning from the head
    /// after each removal
    ///
    /// Each matching node is fully unlinked and dropped before the scan
    /// resumes, so the filter never observes a half-removed chain.
    pub fn list_safe_delete<F>(&mut self, filter: &mut F) -> bool
    where
        F: SearchFilter<T> + ?Sized,
    {
        let mut deleted = false;
        while let Some(node) = self.list_extract_by(filter) {
            drop(node);
            deleted = true;
        }
        deleted
    }

    pub fn list_bsort<S>(&mut self, sorter: &mut S)
    where
        S: SortFilter<T> + ?Sized,
    {
        self.root.bsort(sorter);
    }

    pub fn list_peek(&self, index: u32) -> Option<&T> {
        self.root.peek(index)
    }

    pub fn list_peek_mut(&mut self, index: u32) -> Option<&mut T> {
        self.root.link_at(index).next_mut()
    }

    pub fn list_iterate<V>(&mut self, visitor: &mut V)
    where
        V: ListVisitor<T> + ?Sized,
    {
        self.root.iterate(visitor);
    }

    fn account_removed(&mut self, removed: bool) {
        if removed {
            self.size -= 1;
        }
    }
}

impl<T: LinkedListable> Default for LinkedListHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: LinkedListable> IntoIterator for &'a LinkedListHolder<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
