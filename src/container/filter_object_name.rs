//! Filter matching objects by name or by dot-separated path

use super::filter::{FilterMode, FilterState, ReferenceContainerFilter};
use super::ReferenceContainer;
use crate::object::Reference;
use smallvec::SmallVec;

pub(crate) type PathSegments = SmallVec<[String; 4]>;

/// Split a dotted address into segments
///
/// One leading and one trailing dot are ignored. Returns `None` when the
/// address is empty or contains an empty inner segment (`"A..B"`).
pub(crate) fn parse_path(address: &str) -> Option<PathSegments> {
    let trimmed = address.strip_prefix('.').unwrap_or(address);
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    let segments: PathSegments = trimmed.split('.').map(str::to_string).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Matches objects whose name equals the last segment of `address`
///
/// A multi-segment address is absolute: the filter always stores the path,
/// always recurses and stops at the first match, and a candidate only
/// matches when the containers stored so far spell the leading segments.
pub struct ReferenceContainerFilterObjectName {
    state: FilterState,
    segments: PathSegments,
}

impl ReferenceContainerFilterObjectName {
    pub fn new(occurrence: i32, mode: FilterMode, address: &str) -> Self {
        let segments = parse_path(address).unwrap_or_default();
        let mut filter = Self {
            state: FilterState::new(occurrence, mode),
            segments,
        };
        if filter.segments.len() > 1 {
            filter.state.set_original_occurrence(1);
        }
        filter.set_mode(mode);
        filter
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn ancestors_match(&self, previously_found: &ReferenceContainer, ancestors: &[String]) -> bool {
        if previously_found.size() as usize != ancestors.len() {
            return false;
        }
        previously_found
            .references()
            .iter()
            .zip(ancestors)
            .all(|(found, segment)| found.get().map_or(false, |object| object.has_name(segment)))
    }
}

impl ReferenceContainerFilter for ReferenceContainerFilterObjectName {
    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn set_mode(&mut self, mode: FilterMode) {
        let mode = if self.segments.len() > 1 {
            mode | FilterMode::PATH | FilterMode::RECURSIVE
        } else {
            mode
        };
        self.state.set_mode(mode);
    }

    fn test(&mut self, previously_found: &ReferenceContainer, candidate: &Reference) -> bool {
        let Some((name, ancestors)) = self.segments.split_last() else {
            return false;
        };
        if !ancestors.is_empty() && !self.ancestors_match(previously_found, ancestors) {
            return false;
        }

        let matched = candidate.get().map_or(false, |object| object.has_name(name));
        if matched {
            self.increment_found();
        }
        matched
    }
}
