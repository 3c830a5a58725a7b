// src/errors.rs

//! Crate-wide error types.
//!
//! Errors are split by the phase that raises them:
//! - [`CompileError`]: structural problems found while building the graph.
//!   Always fatal, never retried.
//! - [`TaskError`]: raised by a task implementation. Retried per policy.
//! - [`SchedulingError`] / [`RegistryError`]: engine invariant violations.
//! - [`ExecutionError`]: what a run reports as its first fatal error.
//! - [`RundagError`]: umbrella for the outer layers (config, IO, CLI).

use thiserror::Error;

use crate::dag::TaskName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnresolvedReference { task: TaskName, dependency: TaskName },

    #[error("cycle detected in task DAG: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<TaskName> },

    #[error("no tasks selected to run")]
    NoTasksSelected,

    #[error("selected task '{0}' does not exist in the project")]
    UnknownSelection(TaskName),

    #[error(
        "task '{task}' has an invalid `after` value: expected a string or a list of strings, found {found}"
    )]
    InvalidDependencyType { task: TaskName, found: String },

    #[error("task '{0}' is defined more than once")]
    DuplicateTask(TaskName),

    #[error("task '{task}' has an invalid retry policy: {reason}")]
    InvalidRetryPolicy { task: TaskName, reason: String },
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("task produced a null output")]
    NullOutput,

    #[error("'{0}' is not a declared dependency of this task")]
    UndeclaredDependency(TaskName),

    #[error("output of '{0}' is not available in the registry")]
    MissingOutput(TaskName),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no output recorded for task '{0}'")]
    NotFound(TaskName),

    #[error("output for task '{0}' was already written in this run")]
    AlreadyWritten(TaskName),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("dependency '{dependency}' of task '{task}' was never submitted")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("no task implementation registered for '{0}'")]
    MissingImplementation(TaskName),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("worker running task '{0}' panicked")]
    WorkerPanicked(TaskName),
}

/// The fatal error a run reports as `first_error`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("task '{task}' failed after {attempts} attempt(s): {source}")]
    Task {
        task: TaskName,
        attempts: u32,
        #[source]
        source: TaskError,
    },

    #[error("scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),
}

impl ExecutionError {
    /// Name of the task the error is attributed to, if any.
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionError::Task { task, .. } => Some(task),
            ExecutionError::Scheduling(SchedulingError::UnknownDependency { task, .. })
            | ExecutionError::Scheduling(SchedulingError::MissingImplementation(task))
            | ExecutionError::Scheduling(SchedulingError::WorkerPanicked(task)) => Some(task),
            ExecutionError::Scheduling(SchedulingError::Registry(
                RegistryError::NotFound(task) | RegistryError::AlreadyWritten(task),
            )) => Some(task),
        }
    }
}

#[derive(Error, Debug)]
pub enum RundagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RundagError>;
