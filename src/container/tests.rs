//! Container tests
//!
//! Organized by concern:
//! - Direct children: insert, get, delete, timeouts
//! - Find: occurrences, reverse walks, stored paths, removal
//! - Paths: dotted insert and lookup
//! - Teardown: purge and duplicate
//! - Filters: state bookkeeping and custom predicates

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::object::BasicObject;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;
    use std::thread;

    struct Tracked {
        base: ObjectBase,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }

    impl Object for Tracked {
        fn object_base(&self) -> &ObjectBase {
            &self.base
        }
    }

    fn leaf(name: &str) -> Reference {
        Reference::new(BasicObject::named(name))
    }

    fn tree(name: &str, children: &[&Reference]) -> Reference {
        let container = ReferenceContainer::named(name);
        for child in children {
            container.insert(*child).unwrap();
        }
        Reference::new(container)
    }

    fn names(container: &ReferenceContainer) -> Vec<String> {
        container
            .references()
            .iter()
            .map(|child| child.get().and_then(|object| object.name()).unwrap_or_default())
            .collect()
    }

    /// `Root{B, C{E{H}}, D{F{G}, C2}, H}`
    struct Sample {
        root: Reference,
        nested_h: Reference,
        top_h: Reference,
        e: Reference,
    }

    fn sample() -> Sample {
        let nested_h = leaf("H");
        let top_h = leaf("H");
        let e = tree("E", &[&nested_h]);
        let c = tree("C", &[&e]);
        let f = tree("F", &[&leaf("G")]);
        let d = tree("D", &[&f, &tree("C2", &[])]);
        let root = tree("Root", &[&leaf("B"), &c, &d, &top_h]);
        Sample {
            root,
            nested_h,
            top_h,
            e,
        }
    }

    /// `Root{T1, A{T2, B{T3}}, T4}`, returned with the targets in DFS order
    fn targets() -> (Reference, Vec<Reference>) {
        let found: Vec<Reference> = (0..4).map(|_| leaf("T")).collect();
        let b = tree("B", &[&found[2]]);
        let a = tree("A", &[&found[1], &b]);
        let root = tree("Root", &[&found[0], &a, &found[3]]);
        (root, found)
    }

    fn find_name(root: &Reference, occurrence: i32, mode: FilterMode, name: &str) -> ReferenceContainer {
        let result = ReferenceContainer::new();
        let mut filter = ReferenceContainerFilterObjectName::new(occurrence, mode, name);
        root.as_container().unwrap().find(&result, &mut filter);
        result
    }

    // ===== Direct children =====

    #[test]
    fn test_insert_and_get() {
        let container = ReferenceContainer::named("box");
        let first = leaf("a");
        container.insert(&first).unwrap();
        container.insert(leaf("b")).unwrap();

        assert_eq!(container.size(), 2);
        assert_eq!(container.get(0).unwrap(), first);
        assert_eq!(first.number_of_references(), 2);
        assert_eq!(names(&container), vec!["a", "b"]);
        assert!(container.get(2).is_none());
    }

    #[test]
    fn test_insert_invalid_reference_fails() {
        let container = ReferenceContainer::new();
        assert_eq!(container.insert(Reference::invalid()), Err(ContainerError::InvalidReference));
        assert_eq!(container.size(), 0);
    }

    #[test]
    fn test_insert_at_clamps_to_end() {
        let container = ReferenceContainer::new();
        container.insert(leaf("b")).unwrap();
        container.insert_at(leaf("a"), 0).unwrap();
        container.insert_at(leaf("c"), 100).unwrap();
        container.insert_at(leaf("x"), 1).unwrap();
        assert_eq!(names(&container), vec!["a", "x", "b", "c"]);
    }

    #[test]
    fn test_delete_direct_child() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();

        assert!(!root.delete(&sample.nested_h));
        assert!(root.delete(&sample.top_h));
        assert!(!root.delete(&sample.top_h));
        assert_eq!(names(root), vec!["B", "C", "D"]);
        assert_eq!(sample.top_h.number_of_references(), 1);
    }

    #[test]
    fn test_is_container() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();
        assert!(root.is_container(&sample.e));
        assert!(!root.is_container(&sample.top_h));
        assert!(!root.is_container(&Reference::invalid()));
    }

    #[test]
    fn test_lock_timeout() {
        let container = ReferenceContainer::named("busy");
        container.insert(leaf("a")).unwrap();
        container.set_timeout(Some(Duration::from_millis(10)));
        assert_eq!(container.timeout(), Some(Duration::from_millis(10)));

        let _guard = container.list.lock();
        assert_eq!(container.insert(leaf("b")), Err(ContainerError::LockTimeout));
        assert_eq!(container.size(), 0);
        assert!(container.get(0).is_none());
    }

    #[test]
    fn test_default_timeout_applies_to_new_containers() {
        set_default_timeout(Some(Duration::from_secs(60)));
        let bounded = ReferenceContainer::new();
        set_default_timeout(None);
        let unbounded = ReferenceContainer::new();

        assert_eq!(bounded.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(unbounded.timeout(), None);
    }

    #[test]
    fn test_error_display() {
        let err = ContainerError::NotAContainer {
            segment: "leaf".to_string(),
        };
        assert_eq!(err.to_string(), "Path segment 'leaf' is not a container");
    }

    // ===== Find =====

    #[test]
    fn test_find_first_recursive_match() {
        let sample = sample();
        let result = find_name(&sample.root, 1, FilterMode::RECURSIVE, "H");

        assert_eq!(result.size(), 1);
        assert_eq!(result.get(0).unwrap(), sample.nested_h);
    }

    #[test]
    fn test_find_all_shallow() {
        let sample = sample();
        let result = find_name(&sample.root, -1, FilterMode::SHALLOW, "H");

        assert_eq!(result.size(), 1);
        assert_eq!(result.get(0).unwrap(), sample.top_h);
    }

    #[test]
    fn test_find_path_filter_stores_ancestors() {
        let sample = sample();
        let result = ReferenceContainer::new();
        let mut filter = ReferenceContainerFilterObjectName::new(3, FilterMode::SHALLOW, "C.E.H");

        assert!(filter.is_recursive());
        assert!(filter.is_store_path());
        assert_eq!(filter.state().original_occurrence(), 1);

        let found = sample.root.as_container().unwrap().find(&result, &mut filter);
        assert_eq!(found, 3);
        assert_eq!(names(&result), vec!["C", "E", "H"]);
        assert_eq!(result.get(2).unwrap(), sample.nested_h);
    }

    #[test]
    fn test_find_nth_occurrence() {
        let (root, found) = targets();
        for (occurrence, expected) in found.iter().enumerate() {
            let result = find_name(&root, occurrence as i32 + 1, FilterMode::RECURSIVE, "T");
            assert_eq!(result.size(), 1);
            assert_eq!(result.get(0).as_ref(), Some(expected));
        }

        assert_eq!(find_name(&root, 5, FilterMode::RECURSIVE, "T").size(), 0);
    }

    #[test]
    fn test_find_nth_occurrence_reverse() {
        let (root, found) = targets();
        let mode = FilterMode::RECURSIVE | FilterMode::REVERSE;
        for (occurrence, expected) in found.iter().rev().enumerate() {
            let result = find_name(&root, occurrence as i32 + 1, mode, "T");
            assert_eq!(result.get(0).as_ref(), Some(expected));
        }
    }

    #[test]
    fn test_find_all_recursive_in_traversal_order() {
        let (root, found) = targets();

        let result = find_name(&root, -1, FilterMode::RECURSIVE, "T");
        assert_eq!(result.references(), found);

        let reversed = find_name(&root, -1, FilterMode::RECURSIVE | FilterMode::REVERSE, "T");
        let expected: Vec<Reference> = found.iter().rev().cloned().collect();
        assert_eq!(reversed.references(), expected);
    }

    #[test]
    fn test_find_path_prunes_dead_ends() {
        let sample = sample();
        let result = find_name(&sample.root, 1, FilterMode::RECURSIVE | FilterMode::PATH, "G");
        assert_eq!(names(&result), vec!["D", "F", "G"]);

        let missing = find_name(&sample.root, 1, FilterMode::RECURSIVE | FilterMode::PATH, "Q");
        assert_eq!(missing.size(), 0);
    }

    #[test]
    fn test_find_all_with_path_keeps_each_branch() {
        let sample = sample();
        let result = find_name(&sample.root, -1, FilterMode::RECURSIVE | FilterMode::PATH, "H");
        assert_eq!(names(&result), vec!["C", "E", "H", "H"]);
    }

    #[test]
    fn test_find_remove_all_shallow() {
        let root = tree("Root", &[&leaf("T"), &leaf("A"), &leaf("T"), &leaf("T"), &leaf("B")]);
        let result = find_name(&root, -1, FilterMode::REMOVE, "T");

        assert_eq!(result.size(), 3);
        assert_eq!(names(root.as_container().unwrap()), vec!["A", "B"]);
    }

    #[test]
    fn test_find_remove_reverse() {
        let root = tree("Root", &[&leaf("T"), &leaf("A"), &leaf("T")]);
        let result = find_name(&root, -1, FilterMode::REMOVE | FilterMode::REVERSE, "T");

        assert_eq!(result.size(), 2);
        assert_eq!(names(root.as_container().unwrap()), vec!["A"]);
    }

    #[test]
    fn test_find_remove_only_selected_occurrence() {
        let (root, found) = targets();
        let result = find_name(&root, 2, FilterMode::RECURSIVE | FilterMode::REMOVE, "T");

        assert_eq!(result.references(), vec![found[1].clone()]);
        let remaining = find_name(&root, -1, FilterMode::RECURSIVE, "T");
        assert_eq!(remaining.references(), vec![found[0].clone(), found[2].clone(), found[3].clone()]);
    }

    #[test]
    fn test_find_on_empty_container() {
        let empty = Reference::new(ReferenceContainer::new());
        assert_eq!(find_name(&empty, -1, FilterMode::RECURSIVE, "T").size(), 0);
    }

    #[test]
    fn test_invalid_paths_match_nothing() {
        let sample = sample();
        for path in ["C..H", "", ".", "..", "C.E..H"] {
            let result = find_name(&sample.root, -1, FilterMode::RECURSIVE, path);
            assert_eq!(result.size(), 0, "path {:?}", path);
        }
    }

    #[test]
    fn test_outer_dots_are_ignored() {
        let sample = sample();
        let result = find_name(&sample.root, 1, FilterMode::SHALLOW, ".C.E.H.");
        assert_eq!(names(&result), vec!["C", "E", "H"]);
    }

    #[test]
    fn test_filter_reset_allows_reuse() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();
        let mut filter = ReferenceContainerFilterObjectName::new(1, FilterMode::RECURSIVE, "H");

        let first = ReferenceContainer::new();
        root.find(&first, &mut filter);
        assert!(filter.is_finished());

        let second = ReferenceContainer::new();
        assert_eq!(root.find(&second, &mut filter), 0);

        filter.reset();
        assert_eq!(root.find(&second, &mut filter), 1);
        assert_eq!(second.get(0).unwrap(), sample.nested_h);
    }

    #[test]
    fn test_find_by_reference() {
        let sample = sample();
        let result = ReferenceContainer::new();
        let mut filter =
            ReferenceContainerFilterReferences::new(1, FilterMode::RECURSIVE | FilterMode::PATH, sample.nested_h.clone());

        sample.root.as_container().unwrap().find(&result, &mut filter);
        assert_eq!(names(&result), vec!["C", "E", "H"]);
        assert_eq!(filter.target(), &sample.nested_h);
    }

    #[test]
    fn test_find_invalid_target_matches_nothing() {
        let sample = sample();
        let result = ReferenceContainer::new();
        let mut filter = ReferenceContainerFilterReferences::new(-1, FilterMode::RECURSIVE, Reference::invalid());
        assert_eq!(sample.root.as_container().unwrap().find(&result, &mut filter), 0);
    }

    #[test]
    fn test_find_shared_node_found_twice() {
        let shared = leaf("S");
        let root = tree("Root", &[&tree("A", &[&shared]), &tree("B", &[&shared])]);
        let result = find_name(&root, -1, FilterMode::RECURSIVE, "S");
        assert_eq!(result.references(), vec![shared.clone(), shared.clone()]);
    }

    #[test]
    fn test_find_concurrent_with_inserts() {
        let root = Arc::new(tree("Root", &[&leaf("T")]));

        let writer = {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                let container = root.as_container().unwrap();
                for _ in 0..200 {
                    container.insert(leaf("T")).unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let result = find_name(&root, -1, FilterMode::RECURSIVE, "T");
                        assert!(result.size() >= 1);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(root.as_container().unwrap().size(), 201);
    }

    // ===== Paths =====

    #[test]
    fn test_insert_path_creates_containers() {
        let root = ReferenceContainer::named("Root");
        let target = leaf("ignored");
        root.insert_path("a.b.leaf", &target).unwrap();

        assert_eq!(target.get().unwrap().name().as_deref(), Some("leaf"));
        assert_eq!(root.find_path("a.b.leaf", false).unwrap(), target);
        assert_eq!(root.find_path("leaf", true).unwrap(), target);
        assert!(root.find_path("leaf", false).is_none());

        root.insert_path("a.b.other", leaf("x")).unwrap();
        assert_eq!(root.size(), 1);
        let b = root.find_path("a.b", false).unwrap();
        assert_eq!(names(b.as_container().unwrap()), vec!["leaf", "other"]);
    }

    #[test]
    fn test_insert_path_single_segment() {
        let root = ReferenceContainer::new();
        root.insert_path("solo", leaf("x")).unwrap();
        root.insert_path("", leaf("y")).unwrap();
        assert_eq!(names(&root), vec!["solo", "y"]);
    }

    #[test]
    fn test_insert_path_through_leaf_fails() {
        let root = ReferenceContainer::new();
        root.insert_path("a.leaf", leaf("x")).unwrap();

        let err = root.insert_path("a.leaf.z", leaf("y")).unwrap_err();
        assert_eq!(
            err,
            ContainerError::NotAContainer {
                segment: "leaf".to_string()
            }
        );
    }

    #[test]
    fn test_insert_path_rejects_bad_input() {
        let root = ReferenceContainer::new();
        assert_eq!(
            root.insert_path("a..b", leaf("x")),
            Err(ContainerError::InvalidPath {
                path: "a..b".to_string()
            })
        );
        assert_eq!(root.insert_path("a.b", Reference::invalid()), Err(ContainerError::InvalidReference));
        assert_eq!(root.size(), 0);
    }

    #[test]
    fn test_insert_path_timeout_keeps_name() {
        let root = ReferenceContainer::named("Root");
        root.set_timeout(Some(Duration::from_millis(10)));
        let target = leaf("original");

        let guard = root.list.lock();
        assert_eq!(root.insert_path("renamed", &target), Err(ContainerError::LockTimeout));
        assert_eq!(root.insert_path("a.renamed", &target), Err(ContainerError::LockTimeout));
        drop(guard);

        assert_eq!(target.get().unwrap().name().as_deref(), Some("original"));
        assert_eq!(target.number_of_references(), 1);
        assert_eq!(root.size(), 0);
    }

    #[test]
    fn test_insert_path_timeout_in_nested_container() {
        let root = ReferenceContainer::named("Root");
        root.insert_path("a.first", leaf("x")).unwrap();
        let a = root.find_path("a", false).unwrap();
        let nested = a.as_container().unwrap();
        nested.set_timeout(Some(Duration::from_millis(10)));
        let target = leaf("original");

        let guard = nested.list.lock();
        assert_eq!(root.insert_path("a.second", &target), Err(ContainerError::LockTimeout));
        drop(guard);

        assert_eq!(target.get().unwrap().name().as_deref(), Some("original"));
        root.insert_path("a.second", &target).unwrap();
        assert_eq!(names(nested), vec!["first", "second"]);
    }

    #[test]
    fn test_concurrent_insert_path_shares_containers() {
        let root = Arc::new(ReferenceContainer::named("Root"));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    for j in 0..25 {
                        root.insert_path(&format!("A.B.x{}_{}", i, j), leaf("x")).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(names(&root), vec!["A"]);
        let a = root.find_path("A", false).unwrap();
        assert_eq!(names(a.as_container().unwrap()), vec!["B"]);
        let b = root.find_path("A.B", false).unwrap();
        assert_eq!(b.as_container().unwrap().size(), 200);
    }

    #[test]
    fn test_find_path_on_sample() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();

        assert_eq!(root.find_path("H", false).unwrap(), sample.top_h);
        assert_eq!(root.find_path("H", true).unwrap(), sample.nested_h);
        assert_eq!(root.find_path("C.E", false).unwrap(), sample.e);
        assert!(root.find_path("C.H", false).is_none());
        assert!(root.find_path("", true).is_none());
    }

    #[test]
    fn test_delete_path() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();

        assert!(root.delete_path("C.E.H"));
        assert_eq!(sample.e.as_container().unwrap().size(), 0);
        assert_eq!(root.find_path("H", true).unwrap(), sample.top_h);
        assert!(!root.delete_path("C.E.H"));
        assert_eq!(names(root), vec!["B", "C", "D", "H"]);
    }

    // ===== Teardown =====

    #[test]
    fn test_purge_empties_tree() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();
        root.purge();

        assert_eq!(root.size(), 0);
        assert_eq!(sample.e.as_container().unwrap().size(), 0);
        assert_eq!(sample.nested_h.number_of_references(), 1);
        assert_eq!(sample.e.number_of_references(), 1);
    }

    #[test]
    fn test_purge_breaks_cycle() {
        let drops = Arc::new(AtomicUsize::new(0));
        let a = Reference::new(ReferenceContainer::named("a"));
        let b = Reference::new(ReferenceContainer::named("b"));
        a.as_container().unwrap().insert(&b).unwrap();
        b.as_container().unwrap().insert(&a).unwrap();
        b.as_container()
            .unwrap()
            .insert(Reference::new(Tracked {
                base: ObjectBase::named("t"),
                drops: Arc::clone(&drops),
            }))
            .unwrap();

        a.as_container().unwrap().purge();
        assert_eq!(a.number_of_references(), 1);
        assert_eq!(b.number_of_references(), 1);

        drop(a);
        drop(b);
        assert_eq!(drops.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_purge_into_collects_descendants() {
        let sample = sample();
        let purge_list = ReferenceContainer::new();
        sample.root.as_container().unwrap().purge_into(&purge_list);

        assert_eq!(names(&purge_list), vec!["B", "C", "D", "H", "E", "H", "F", "C2", "G"]);
    }

    #[test]
    fn test_duplicate_shares_children() {
        let sample = sample();
        let root = sample.root.as_container().unwrap();
        root.set_timeout(Some(Duration::from_secs(5)));

        let copy = root.duplicate();
        assert_eq!(copy.object_base().name().as_deref(), Some("Root"));
        assert_eq!(copy.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(copy.references(), root.references());
        assert_eq!(sample.top_h.number_of_references(), 3);

        copy.delete(&sample.top_h);
        assert_eq!(root.size(), 4);
    }

    // ===== Filters =====

    #[test]
    fn test_filter_state_countdown() {
        let mut state = FilterState::new(2, FilterMode::RECURSIVE);
        assert!(!state.is_finished());
        state.increment_found();
        assert_eq!(state.occurrence(), 1);
        state.increment_found();
        assert!(state.is_finished());
        state.increment_found();
        assert_eq!(state.occurrence(), 0);

        state.reset();
        assert_eq!(state.occurrence(), 2);
    }

    #[test]
    fn test_filter_state_search_all_never_finishes() {
        let mut state = FilterState::new(-1, FilterMode::SHALLOW);
        assert!(state.is_search_all());
        for _ in 0..10 {
            state.increment_found();
        }
        assert!(!state.is_finished());
    }

    #[test]
    fn test_object_name_single_segment_keeps_mode() {
        let mut filter = ReferenceContainerFilterObjectName::new(-1, FilterMode::REVERSE, "H");
        assert_eq!(filter.segments(), ["H".to_string()]);
        assert_eq!(filter.mode(), FilterMode::REVERSE);
        assert!(filter.is_search_all());

        filter.set_mode(FilterMode::REMOVE);
        assert!(filter.is_remove());
        assert!(!filter.is_recursive());
    }

    #[test]
    fn test_object_name_path_forces_mode() {
        let mut filter = ReferenceContainerFilterObjectName::new(-1, FilterMode::REVERSE, "a.b");
        assert!(!filter.is_search_all());
        assert_eq!(
            filter.mode(),
            FilterMode::REVERSE | FilterMode::PATH | FilterMode::RECURSIVE
        );

        filter.set_mode(FilterMode::SHALLOW);
        assert!(filter.is_recursive());
        assert!(filter.is_store_path());
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("a.b").unwrap().as_slice(), ["a", "b"]);
        assert_eq!(parse_path(".a.").unwrap().as_slice(), ["a"]);
        assert!(parse_path("").is_none());
        assert!(parse_path("a..b").is_none());
        assert!(parse_path("..a").is_none());
    }

    struct ContainersOnly {
        state: FilterState,
    }

    impl ReferenceContainerFilter for ContainersOnly {
        fn state(&self) -> &FilterState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut FilterState {
            &mut self.state
        }

        fn test(&mut self, _previously_found: &ReferenceContainer, candidate: &Reference) -> bool {
            let matched = candidate.is_container();
            if matched {
                self.increment_found();
            }
            matched
        }
    }

    #[test]
    fn test_custom_filter() {
        let sample = sample();
        let result = ReferenceContainer::new();
        let mut filter = ContainersOnly {
            state: FilterState::new(-1, FilterMode::RECURSIVE),
        };
        sample.root.as_container().unwrap().find(&result, &mut filter);
        assert_eq!(names(&result), vec!["C", "E", "D", "F", "C2"]);
    }

    #[test]
    fn test_node_refuses_invalid_reference() {
        let first = leaf("a");
        let mut node = ReferenceContainerNode::new(first.clone());
        assert!(!node.set_reference(Reference::invalid()));
        assert_eq!(node.reference(), &first);

        let second = leaf("b");
        assert!(node.set_reference(second.clone()));
        assert_eq!(first.number_of_references(), 1);
        assert_eq!(node.reference(), &second);
    }

    #[test]
    fn test_registered_class() {
        let item = ClassRegistryDatabase::instance().find("ReferenceContainer").unwrap();
        let reference = Reference::new(ReferenceContainer::new());
        assert!(Arc::ptr_eq(reference.get().unwrap().class_registry_item().unwrap(), &item));
    }
}
