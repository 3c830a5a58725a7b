// src/engine/mod.rs

//! Orchestration entry points tying the compiler and executor together.
//!
//! [`Project`] owns task descriptors, their implementations and the run
//! context; it compiles a selection and executes it, either against its own
//! registry or, for nested runs, against a scoped child registry.

pub mod project;

pub use project::{NestedRun, Project};
