// src/dag/mod.rs

//! Dependency graph compilation.
//!
//! - [`descriptor`] holds the immutable per-task records handed over by task
//!   discovery.
//! - [`graph`] builds and validates the petgraph-backed DAG (unresolved
//!   references, cycles) and derives the global topological order.
//! - [`compiler`] turns descriptors plus a user selection into a
//!   [`CompiledGraph`] with the ordered list of tasks to run.
//! - [`manifest`] serializes a compiled graph for external inspection.

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

pub mod compiler;
pub mod descriptor;
pub mod graph;
pub mod manifest;

pub use compiler::{CompiledGraph, DisplayPosition, Selection, compile};
pub use descriptor::{DependencySpec, RetryPolicy, TaskDescriptor};
pub use graph::DagGraph;
pub use manifest::CompiledManifest;
