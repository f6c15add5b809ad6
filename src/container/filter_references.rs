//! Filter matching one specific object by identity

use super::filter::{FilterMode, FilterState, ReferenceContainerFilter};
use super::ReferenceContainer;
use crate::object::Reference;

pub struct ReferenceContainerFilterReferences {
    state: FilterState,
    target: Reference,
}

impl ReferenceContainerFilterReferences {
    pub fn new(occurrence: i32, mode: FilterMode, target: Reference) -> Self {
        Self {
            state: FilterState::new(occurrence, mode),
            target,
        }
    }

    pub fn target(&self) -> &Reference {
        &self.target
    }
}

impl ReferenceContainerFilter for ReferenceContainerFilterReferences {
    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn test(&mut self, _previously_found: &ReferenceContainer, candidate: &Reference) -> bool {
        let matched = self.target.is_valid() && *candidate == self.target;
        if matched {
            self.increment_found();
        }
        matched
    }
}
