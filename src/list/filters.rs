//! Predicate, ordering and visitor capabilities consumed by list operations
//!
//! Each capability is a trait with a blanket impl for the matching closure
//! shape, so callers can pass either a stateful filter object or a closure.

use core::cmp::Ordering;

/// Node predicate used by search, extract and delete operations
pub trait SearchFilter<T: ?Sized> {
    fn test(&mut self, node: &T) -> bool;
}

impl<T: ?Sized, F> SearchFilter<T> for F
where
    F: FnMut(&T) -> bool,
{
    #[inline]
    fn test(&mut self, node: &T) -> bool {
        self(node)
    }
}

/// Total order over nodes
///
/// `Ordering::Greater` means the first node must not precede the second.
pub trait SortFilter<T: ?Sized> {
    fn compare(&mut self, first: &T, second: &T) -> Ordering;
}

impl<T: ?Sized, F> SortFilter<T> for F
where
    F: FnMut(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&mut self, first: &T, second: &T) -> Ordering {
        self(first, second)
    }
}

/// Visitor invoked once per node by `iterate`
pub trait ListVisitor<T: ?Sized> {
    fn visit(&mut self, node: &mut T);
}

impl<T: ?Sized, F> ListVisitor<T> for F
where
    F: FnMut(&mut T),
{
    #[inline]
    fn visit(&mut self, node: &mut T) {
        self(node)
    }
}
