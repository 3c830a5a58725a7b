use rundag::dag::{DisplayPosition, Selection, TaskDescriptor, compile};
use rundag::errors::CompileError;
use rundag_test_utils::builders::{chain_abc, descriptors};

fn select(names: &[&str]) -> Selection {
    Selection::tasks(names.iter().copied())
}

#[test]
fn selecting_last_task_pulls_in_whole_chain() {
    let graph = compile(&chain_abc(), &select(&["C"])).unwrap();

    assert_eq!(graph.selected_order(), ["A", "B", "C"]);
    assert!(graph.is_explicit("C"));
    assert!(!graph.is_explicit("A"));
    assert!(!graph.is_explicit("B"));
}

#[test]
fn selecting_middle_task_skips_downstream() {
    let graph = compile(&chain_abc(), &select(&["B"])).unwrap();

    assert_eq!(graph.selected_order(), ["A", "B"]);
    assert_eq!(graph.topological_order(), ["A", "B", "C"]);
    assert_eq!(graph.graph().dependents_of("B"), ["C"]);
    assert_eq!(graph.graph().dependencies_of("B"), ["A"]);
}

#[test]
fn topological_order_respects_every_edge() {
    // Discovery order deliberately lists dependents first.
    let descs = descriptors(&[
        ("report", &["clean", "stats"]),
        ("stats", &["clean"]),
        ("clean", &["fetch"]),
        ("fetch", &[]),
        ("lint", &[]),
    ]);
    let graph = compile(&descs, &select(&["report", "lint"])).unwrap();
    let order = graph.topological_order();
    let pos = |n: &str| order.iter().position(|x| x == n).unwrap();

    for d in &descs {
        for dep in d.dependencies() {
            assert!(pos(dep) < pos(d.identity()), "{dep} must precede {}", d.identity());
        }
    }
}

#[test]
fn ties_are_broken_by_discovery_order() {
    let descs = descriptors(&[("z", &[]), ("m", &[]), ("a", &[]), ("after_all", &["a", "z"])]);
    let graph = compile(&descs, &Selection::default().all_upstream(true)).unwrap();

    assert_eq!(graph.topological_order(), ["z", "m", "a", "after_all"]);
}

#[test]
fn compilation_is_deterministic() {
    let descs = descriptors(&[
        ("d", &["b", "c"]),
        ("b", &["a"]),
        ("c", &["a"]),
        ("a", &[]),
        ("e", &[]),
    ]);
    let first = compile(&descs, &select(&["d", "e"])).unwrap();
    for _ in 0..20 {
        let again = compile(&descs, &select(&["d", "e"])).unwrap();
        assert_eq!(first.topological_order(), again.topological_order());
        assert_eq!(first.selected_order(), again.selected_order());
    }
}

#[test]
fn two_task_cycle_is_reported_as_closed_path() {
    let descs = descriptors(&[("A", &["B"]), ("B", &["A"])]);
    let err = compile(&descs, &select(&["A"])).unwrap_err();

    assert_eq!(
        err,
        CompileError::CyclicDependency {
            cycle: vec!["A".into(), "B".into(), "A".into()]
        }
    );
    assert!(err.to_string().contains("A -> B -> A"));
}

#[test]
fn self_dependency_is_a_cycle() {
    let descs = descriptors(&[("A", &["A"])]);
    let err = compile(&descs, &select(&["A"])).unwrap_err();

    assert!(matches!(err, CompileError::CyclicDependency { ref cycle } if cycle == &["A", "A"]));
}

#[test]
fn unresolved_dependency_names_task_and_missing_dependency() {
    let descs = descriptors(&[("A", &[]), ("B", &["X"])]);
    let err = compile(&descs, &select(&["B"])).unwrap_err();

    assert_eq!(
        err,
        CompileError::UnresolvedReference {
            task: "B".into(),
            dependency: "X".into()
        }
    );
}

#[test]
fn unknown_selection_is_rejected() {
    let err = compile(&chain_abc(), &select(&["nope"])).unwrap_err();
    assert_eq!(err, CompileError::UnknownSelection("nope".into()));
}

#[test]
fn empty_selection_without_expansion_is_an_error() {
    let err = compile(&chain_abc(), &Selection::default()).unwrap_err();
    assert_eq!(err, CompileError::NoTasksSelected);
}

#[test]
fn duplicate_task_identity_is_rejected() {
    let descs = vec![TaskDescriptor::root("A"), TaskDescriptor::root("A")];
    let err = compile(&descs, &select(&["A"])).unwrap_err();
    assert_eq!(err, CompileError::DuplicateTask("A".into()));
}

#[test]
fn duplicate_selections_are_collapsed() {
    let graph = compile(&chain_abc(), &select(&["C", "A", "C"])).unwrap();

    assert_eq!(graph.selected_order(), ["A", "B", "C"]);
    assert_eq!(graph.position("C"), Some(DisplayPosition { index: 2, total: 2 }));
}

#[test]
fn expansion_runs_everything_as_explicit() {
    for selection in [
        select(&["B"]).all_upstream(true),
        select(&["B"]).all_downstream(true),
        Selection::default().all_downstream(true),
    ] {
        let graph = compile(&chain_abc(), &selection).unwrap();
        assert_eq!(graph.selected_order(), ["A", "B", "C"]);
        assert!(graph.is_expanded());
        for name in ["A", "B", "C"] {
            assert!(graph.is_explicit(name));
        }
    }
}

#[test]
fn positions_with_expansion_use_global_order() {
    let graph = compile(&chain_abc(), &Selection::default().all_upstream(true)).unwrap();

    assert_eq!(graph.position("A"), Some(DisplayPosition { index: 1, total: 3 }));
    assert_eq!(graph.position("B"), Some(DisplayPosition { index: 2, total: 3 }));
    assert_eq!(graph.position("C"), Some(DisplayPosition { index: 3, total: 3 }));
}

#[test]
fn positions_for_named_tasks_follow_topological_rank() {
    let descs = descriptors(&[("A", &[]), ("B", &["A"]), ("C", &["B"]), ("D", &[])]);
    // Named out of order on purpose.
    let graph = compile(&descs, &select(&["C", "A"])).unwrap();

    assert_eq!(graph.position("A"), Some(DisplayPosition { index: 1, total: 2 }));
    assert_eq!(graph.position("C"), Some(DisplayPosition { index: 2, total: 2 }));
    // Pulled in as a dependency only.
    assert_eq!(graph.position("B"), None);
    assert_eq!(graph.position("D"), None);
}

#[test]
fn dependencies_are_normalized_and_deduplicated() {
    let d = TaskDescriptor::new("C", vec!["A", "B", "A"]);
    assert_eq!(d.dependencies(), ["A", "B"]);

    let single = TaskDescriptor::new("B", "A");
    assert_eq!(single.dependencies(), ["A"]);

    let none = TaskDescriptor::root("A");
    assert!(none.dependencies().is_empty());
}
