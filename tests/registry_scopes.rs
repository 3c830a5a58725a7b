use std::thread;

use rundag::errors::RegistryError;
use rundag::exec::{Hooks, RunContext};
use rundag::registry::TaskRegistry;
use serde_json::json;

#[test]
fn write_once_per_identity() {
    let registry = TaskRegistry::new();
    registry.set("A", json!(1)).unwrap();

    let err = registry.set("A", json!(2)).unwrap_err();
    assert_eq!(err, RegistryError::AlreadyWritten("A".into()));
    assert_eq!(registry.get("A").unwrap(), json!(1));
}

#[test]
fn missing_entry_is_not_found() {
    let registry = TaskRegistry::new();
    assert_eq!(registry.get("ghost"), Err(RegistryError::NotFound("ghost".into())));
    assert!(!registry.contains("ghost"));
}

#[test]
fn clones_share_storage() {
    let registry = TaskRegistry::new();
    let handle = registry.clone();
    handle.set("A", json!("a")).unwrap();

    assert_eq!(registry.get("A").unwrap(), json!("a"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn concurrent_writers_of_distinct_keys_all_land() {
    let registry = TaskRegistry::new();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || registry.set(format!("t{i}"), json!(i)))
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    assert_eq!(registry.len(), 8);
    assert_eq!(registry.get("t5").unwrap(), json!(5));
}

#[test]
fn scoped_reads_fall_through_and_writes_stay_local() {
    let parent = TaskRegistry::new();
    parent.set("upstream", json!("outer")).unwrap();

    let child = parent.scoped();
    assert_eq!(child.get("upstream").unwrap(), json!("outer"));

    child.set("inner", json!(1)).unwrap();
    assert!(child.contains("inner"));
    assert!(!parent.contains("inner"));

    // A child may shadow its parent.
    child.set("upstream", json!("shadow")).unwrap();
    assert_eq!(child.get("upstream").unwrap(), json!("shadow"));
    assert_eq!(parent.get("upstream").unwrap(), json!("outer"));

    assert_eq!(child.len(), 2);
    assert_eq!(child.snapshot().keys().collect::<Vec<_>>(), ["inner", "upstream"]);
}

#[test]
fn merge_moves_scope_into_parent() {
    let parent = TaskRegistry::new();
    parent.set("x", json!("old")).unwrap();

    let child = parent.scoped();
    child.set("x", json!("new")).unwrap();
    child.set("y", json!(true)).unwrap();

    assert_eq!(child.merge_into_parent(), 2);
    assert_eq!(parent.get("x").unwrap(), json!("new"));
    assert_eq!(parent.get("y").unwrap(), json!(true));
    assert!(child.is_empty());

    assert_eq!(TaskRegistry::new().merge_into_parent(), 0);
}

#[test]
fn scoped_context_keeps_vars_and_hooks() {
    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    let ctx = RunContext::new(TaskRegistry::new())
        .with_vars([("env".to_string(), "dev".to_string())].into())
        .with_hooks(Hooks::new().with(Marker(7)));
    let nested = ctx.scoped();

    assert_eq!(nested.var("env"), Some("dev"));
    assert_eq!(nested.hooks().get::<Marker>(), Some(&Marker(7)));
    assert!(nested.registry().parent().is_some());
    assert!(ctx.hooks().get::<String>().is_none());
}
