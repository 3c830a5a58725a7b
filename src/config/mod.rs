// src/config/mod.rs

//! Project manifest loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).
//!
//! The manifest is one way of discovering tasks; the compiler and executor
//! only ever see the resulting [`crate::dag::TaskDescriptor`]s.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::{ConfigSection, ProjectFile, ProjectTask, RawProjectFile, TaskConfig, normalize_after};
pub use validate::validate_project;
