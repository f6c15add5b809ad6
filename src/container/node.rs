//! List node wrapping one reference held by a container

use crate::list::{Link, LinkedListable};
use crate::object::Reference;

pub struct ReferenceContainerNode {
    link: Link<ReferenceContainerNode>,
    reference: Reference,
}

impl ReferenceContainerNode {
    pub fn new(reference: Reference) -> Self {
        Self {
            link: Link::new(),
            reference,
        }
    }

    #[inline]
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Replace the held reference; refuses invalid ones
    pub fn set_reference(&mut self, reference: Reference) -> bool {
        if !reference.is_valid() {
            return false;
        }
        self.reference = reference;
        true
    }
}

impl LinkedListable for ReferenceContainerNode {
    fn link(&self) -> &Link<Self> {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link<Self> {
        &mut self.link
    }
}
