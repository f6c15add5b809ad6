//! Intrusive singly-linked lists
//!
//! Nodes embed their own forward `Link` and are moved around as `Box<T>`,
//! so every node has exactly one owner: either a `Link` slot inside a chain
//! or the caller that extracted it. Operations that only detach (`extract*`,
//! `reset`) hand the box back; operations that destroy (`delete*`,
//! `clean_up`) drop it in place.

mod filters;
mod holder;
mod link;


pub use filters::{ListVisitor, SearchFilter, SortFilter};
pub use holder::LinkedListHolder;
pub use link::{Iter, Link, LinkedListable};
