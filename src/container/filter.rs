//! Search predicates driving `ReferenceContainer::find`

use super::ReferenceContainer;
use crate::object::Reference;
use bitflags::bitflags;

bitflags! {
    /// How `find` walks the tree and what it does with matches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FilterMode: u32 {
        /// Descend into child containers
        const RECURSIVE = 1;
        /// Store the containers leading to each match
        const PATH = 2;
        /// Visit children right to left
        const REVERSE = 4;
        /// Remove matches from the container they were found in
        const REMOVE = 8;
    }
}

impl FilterMode {
    /// Only the direct children, left to right
    pub const SHALLOW: FilterMode = FilterMode::empty();
}

/// Occurrence countdown and mode shared by every filter
///
/// `occurrence` counts down to 0 as matches are found; `-1` asks for every
/// match and never finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    occurrence: i32,
    original_occurrence: i32,
    mode: FilterMode,
}

impl FilterState {
    pub fn new(occurrence: i32, mode: FilterMode) -> Self {
        Self {
            occurrence,
            original_occurrence: occurrence,
            mode,
        }
    }

    #[inline]
    pub fn occurrence(&self) -> i32 {
        self.occurrence
    }

    #[inline]
    pub fn original_occurrence(&self) -> i32 {
        self.original_occurrence
    }

    #[inline]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    pub fn set_original_occurrence(&mut self, occurrence: i32) {
        self.original_occurrence = occurrence;
        self.occurrence = occurrence;
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.occurrence == 0
    }

    #[inline]
    pub fn is_search_all(&self) -> bool {
        self.original_occurrence == -1
    }

    pub fn increment_found(&mut self) {
        if self.occurrence > 0 {
            self.occurrence -= 1;
        }
    }

    pub fn reset(&mut self) {
        self.occurrence = self.original_occurrence;
    }
}

/// Predicate consumed by `ReferenceContainer::find`
///
/// `test` sees the results gathered so far and one candidate; a filter that
/// accepts the candidate must call `increment_found` itself.
pub trait ReferenceContainerFilter {
    fn state(&self) -> &FilterState;
    fn state_mut(&mut self) -> &mut FilterState;

    fn test(&mut self, previously_found: &ReferenceContainer, candidate: &Reference) -> bool;

    fn set_mode(&mut self, mode: FilterMode) {
        self.state_mut().set_mode(mode);
    }

    fn mode(&self) -> FilterMode {
        self.state().mode()
    }

    fn set_original_occurrence(&mut self, occurrence: i32) {
        self.state_mut().set_original_occurrence(occurrence);
    }

    fn increment_found(&mut self) {
        self.state_mut().increment_found();
    }

    /// Restore the occurrence countdown so the filter can be reused
    fn reset(&mut self) {
        self.state_mut().reset();
    }

    fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    fn is_search_all(&self) -> bool {
        self.state().is_search_all()
    }

    fn is_recursive(&self) -> bool {
        self.mode().contains(FilterMode::RECURSIVE)
    }

    fn is_store_path(&self) -> bool {
        self.mode().contains(FilterMode::PATH)
    }

    fn is_reverse(&self) -> bool {
        self.mode().contains(FilterMode::REVERSE)
    }

    fn is_remove(&self) -> bool {
        self.mode().contains(FilterMode::REMOVE)
    }
}
