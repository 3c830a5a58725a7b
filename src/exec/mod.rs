// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task`] defines the [`Task`] contract and the [`TaskSet`] of
//!   implementations.
//! - [`context`] holds the run-wide [`RunContext`] and the per-attempt
//!   [`TaskContext`].
//! - [`runner`] runs one task with its retry policy.
//! - [`executor`] schedules a compiled graph, sequentially or on a bounded
//!   worker pool.
//! - [`result`] is what a run hands back.
//! - [`shell`] implements tasks as shell commands.

pub mod context;
pub mod executor;
pub mod result;
pub mod runner;
pub mod shell;
pub mod task;

pub use context::{Hooks, RunContext, TaskContext};
pub use executor::{CancellationFlag, DagExecutor};
pub use result::{ExecutionResult, RunStatus, TaskOutcome, TaskReport};
pub use runner::{Completion, TaskJob, run_one};
pub use shell::ShellTask;
pub use task::{FnTask, Task, TaskFuture, TaskSet};
