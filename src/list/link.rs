//! Intrusive singly-linked chain primitives
//!
//! A `Link<T>` is the owning "next" slot embedded in every node. The same
//! type doubles as the sentinel head of a `LinkedListHolder`, so operations
//! that act "after this node" are written once on `Link` and shared by the
//! node-level and holder-level APIs.
//!
//! Cursors walk the chain by matching on `cur.next` in place and rebinding
//! `cur` to the successor's link; every splice goes through `take()` so a
//! node is owned by exactly one slot at any time.

use core::cmp::Ordering;
use core::ptr;

use super::filters::{ListVisitor, SearchFilter, SortFilter};

/// Owning forward pointer embedded in a list node
pub struct Link<T: LinkedListable> {
    next: Option<Box<T>>,
}

impl<T: LinkedListable> Link<T> {
    pub const fn new() -> Self {
        Self { next: None }
    }

    #[inline]
    pub fn next(&self) -> Option<&T> {
        self.next.as_deref()
    }

    #[inline]
    pub fn next_mut(&mut self) -> Option<&mut T> {
        self.next.as_deref_mut()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }

    /// Detach the whole chain following this link
    #[inline]
    pub fn take(&mut self) -> Option<Box<T>> {
        self.next.take()
    }

    /// Number of nodes after this link (O(n))
    pub fn len(&self) -> u32 {
        self.iter().count() as u32
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { next: self.next() }
    }

    /// Splice `chain` (with all its successors) right after this link
    pub fn insert(&mut self, mut chain: Box<T>) {
        let rest = self.next.take();
        chain.link_mut().tail().next = rest;
        self.next = Some(chain);
    }

    /// Sort `chain` internally and merge it into the (already ordered) successors
    ///
    /// Without a sorter this is a plain `insert`.
    pub fn insert_sorted<S>(&mut self, chain: Box<T>, sorter: Option<&mut S>)
    where
        S: SortFilter<T> + ?Sized,
    {
        let Some(sorter) = sorter else {
            self.insert(chain);
            return;
        };

        let mut pending = Link { next: Some(chain) };
        pending.bsort(&mut *sorter);

        let mut cur: &mut Link<T> = self;
        loop {
            let before = match (cur.next.as_deref(), pending.next.as_deref()) {
                (Some(existing), Some(candidate)) => {
                    sorter.compare(existing, candidate) == Ordering::Greater
                }
                _ => break,
            };

            if before {
                if let Some(mut item) = pending.next.take() {
                    pending.next = item.link_mut().next.take();
                    item.link_mut().next = cur.next.take();
                    cur.next = Some(item);
                }
            } else {
                match cur.next {
                    Some(ref mut node) => cur = node.link_mut(),
                    None => break,
                }
            }
        }

        // Loop only leaves a pending remainder once `cur` is the tail
        if pending.next.is_some() {
            cur.next = pending.next.take();
        }
    }

    /// Append a single node at the tail
    ///
    /// The node's own trailing chain is severed and handed back.
    #[must_use = "the severed trailing chain is dropped if ignored"]
    pub fn add(&mut self, mut node: Box<T>) -> Option<Box<T>> {
        let severed = node.link_mut().next.take();
        self.tail().next = Some(node);
        severed
    }

    /// Append a node together with its trailing chain
    pub fn add_l(&mut self, chain: Box<T>) {
        self.tail().next = Some(chain);
    }

    /// Identity search over the successors
    pub fn contains(&self, node: *const T) -> bool {
        self.iter().any(|candidate| ptr::eq(candidate, node))
    }

    /// First successor accepted by `filter`
    pub fn find_by<F>(&self, filter: &mut F) -> Option<&T>
    where
        F: SearchFilter<T> + ?Sized,
    {
        self.iter().find(|candidate| filter.test(candidate))
    }

    /// Unlink the successor with the given identity
    pub fn extract(&mut self, node: *const T) -> Option<Box<T>> {
        self.extract_by(&mut |candidate: &T| ptr::eq(candidate, node))
    }

    /// Unlink the first successor accepted by `filter`
    pub fn extract_by<F>(&mut self, filter: &mut F) -> Option<Box<T>>
    where
        F: SearchFilter<T> + ?Sized,
    {
        let mut cur: &mut Link<T> = self;
        loop {
            let hit = match cur.next.as_deref() {
                Some(candidate) => filter.test(candidate),
                None => return None,
            };
            if hit {
                return cur.unlink_next();
            }
            match cur.next {
                Some(ref mut node) => cur = node.link_mut(),
                None => return None,
            }
        }
    }

    /// Unlink and drop the successor with the given identity
    pub fn delete(&mut self, node: *const T) -> bool {
        self.extract(node).is_some()
    }

    /// Unlink and drop every successor accepted by `filter`
    pub fn delete_by<F>(&mut self, filter: &mut F) -> u32
    where
        F: SearchFilter<T> + ?Sized,
    {
        let mut deleted = 0u32;
        let mut cur: &mut Link<T> = self;
        loop {
            let hit = match cur.next.as_deref() {
                Some(candidate) => filter.test(candidate),
                None => break,
            };
            if hit {
                drop(cur.unlink_next());
                deleted += 1;
                continue;
            }
            match cur.next {
                Some(ref mut node) => cur = node.link_mut(),
                None => break,
            }
        }
        deleted
    }

    /// Successor at zero-based `index`
    pub fn peek(&self, index: u32) -> Option<&T> {
        self.next()?.peek(index)
    }

    /// Bubble sort of the successors; this link stays fixed as the head
    pub fn bsort<S>(&mut self, sorter: &mut S)
    where
        S: SortFilter<T> + ?Sized,
    {
        let count = self.len();
        if count < 2 {
            return;
        }

        for pass in 0..count - 1 {
            let comparisons = count - 1 - pass;
            let mut cur: &mut Link<T> = self;
            for _ in 0..comparisons {
                let misordered = match cur.next.as_deref() {
                    Some(first) => match first.next() {
                        Some(second) => sorter.compare(first, second) == Ordering::Greater,
                        None => break,
                    },
                    None => break,
                };
                if misordered {
                    cur.swap_next_pair();
                }
                match cur.next {
                    Some(ref mut node) => cur = node.link_mut(),
                    None => break,
                }
            }
        }
    }

    /// Visit every successor in order
    pub fn iterate<V>(&mut self, visitor: &mut V)
    where
        V: ListVisitor<T> + ?Sized,
    {
        let mut cur: &mut Link<T> = self;
        loop {
            match cur.next {
                Some(ref mut node) => {
                    visitor.visit(node);
                    cur = node.link_mut();
                }
                None => break,
            }
        }
    }

    /// Link at zero-based `index`, clamped to the tail
    pub(crate) fn link_at(&mut self, index: u32) -> &mut Link<T> {
        let mut cur: &mut Link<T> = self;
        let mut remaining = index;
        while remaining > 0 {
            match cur.next {
                Some(ref mut node) => cur = node.link_mut(),
                None => break,
            }
            remaining -= 1;
        }
        cur
    }

    /// The empty link terminating the chain
    pub(crate) fn tail(&mut self) -> &mut Link<T> {
        let mut cur: &mut Link<T> = self;
        loop {
            match cur.next {
                Some(ref mut node) => cur = node.link_mut(),
                None => return cur,
            }
        }
    }

    pub(crate) fn unlink_next(&mut self) -> Option<Box<T>> {
        let mut node = self.next.take()?;
        self.next = node.link_mut().next.take();
        Some(node)
    }

    pub(crate) fn replace(&mut self, chain: Option<Box<T>>) -> Option<Box<T>> {
        core::mem::replace(&mut self.next, chain)
    }

    fn swap_next_pair(&mut self) {
        if let Some(mut first) = self.next.take() {
            match first.link_mut().next.take() {
                Some(mut second) => {
                    first.link_mut().next = second.link_mut().next.take();
                    second.link_mut().next = Some(first);
                    self.next = Some(second);
                }
                None => self.next = Some(first),
            }
        }
    }
}

impl<T: LinkedListable> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LinkedListable> Drop for Link<T> {
    // Unroll the chain so long lists do not recurse once per node
    fn drop(&mut self) {
        let mut cur = self.next.take();
        while let Some(mut node) = cur {
            cur = node.link_mut().next.take();
        }
    }
}

/// Borrowing iterator over a chain
pub struct Iter<'a, T: LinkedListable> {
    next: Option<&'a T>,
}

impl<'a, T: LinkedListable> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.next?;
        self.next = node.link().next();
        Some(node)
    }
}

/// A node that can be threaded on an intrusive list
///
/// Implementors only expose their embedded `Link`; every list primitive is
/// provided. Operations named after the classic list vocabulary act on the
/// sub-chain that starts at `self`: `size`, `search*`, `peek` and `iterate`
/// include `self`, while the splicing operations act on its successors.
pub trait LinkedListable: Sized {
    fn link(&self) -> &Link<Self>;
    fn link_mut(&mut self) -> &mut Link<Self>;

    #[inline]
    fn next(&self) -> Option<&Self> {
        self.link().next()
    }

    /// Nodes from `self` to the end of the chain
    fn size(&self) -> u32 {
        1 + self.link().len()
    }

    fn insert(&mut self, chain: Box<Self>) {
        self.link_mut().insert(chain);
    }

    fn insert_sorted<S>(&mut self, chain: Box<Self>, sorter: Option<&mut S>)
    where
        S: SortFilter<Self> + ?Sized,
    {
        self.link_mut().insert_sorted(chain, sorter);
    }

    #[must_use = "the severed trailing chain is dropped if ignored"]
    fn add(&mut self, node: Box<Self>) -> Option<Box<Self>> {
        self.link_mut().add(node)
    }

    fn add_l(&mut self, chain: Box<Self>) {
        self.link_mut().add_l(chain);
    }

    fn search(&self, node: *const Self) -> bool {
        ptr::eq(self, node) || self.link().contains(node)
    }

    fn search_by<F>(&self, filter: &mut F) -> Option<&Self>
    where
        F: SearchFilter<Self> + ?Sized,
    {
        if filter.test(self) {
            return Some(self);
        }
        self.link().find_by(filter)
    }

    fn extract(&mut self, node: *const Self) -> Option<Box<Self>> {
        self.link_mut().extract(node)
    }

    fn extract_by<F>(&mut self, filter: &mut F) -> Option<Box<Self>>
    where
        F: SearchFilter<Self> + ?Sized,
    {
        self.link_mut().extract_by(filter)
    }

    fn delete(&mut self, node: *const Self) -> bool {
        self.link_mut().delete(node)
    }

    fn delete_by<F>(&mut self, filter: &mut F) -> u32
    where
        F: SearchFilter<Self> + ?Sized,
    {
        self.link_mut().delete_by(filter)
    }

    /// Node at zero-based `index`, where `self` is index 0
    fn peek(&self, index: u32) -> Option<&Self> {
        let mut cur = Some(self);
        for _ in 0..index {
            cur = cur?.next();
        }
        cur
    }

    fn bsort<S>(&mut self, sorter: &mut S)
    where
        S: SortFilter<Self> + ?Sized,
    {
        self.link_mut().bsort(sorter);
    }

    fn iterate<V>(&mut self, visitor: &mut V)
    where
        V: ListVisitor<Self> + ?Sized,
    {
        visitor.visit(self);
        self.link_mut().iterate(visitor);
    }
}
