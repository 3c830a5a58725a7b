// src/exec/result.rs

//! Outcome of one run, as handed back to callers.

use std::time::Duration;

use crate::dag::{DisplayPosition, TaskName};
use crate::errors::ExecutionError;

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every selected task completed.
    Succeeded,
    /// A pre-flight check failed; no task was started.
    NotAttempted,
    /// A task failed (after its retries) and the run was cancelled.
    Failed,
}

/// Final outcome of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
}

/// One entry of the run log.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskName,
    pub attempts: u32,
    pub duration: Duration,
    pub outcome: TaskOutcome,
    pub explicit: bool,
    pub position: Option<DisplayPosition>,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded)
    }
}

/// Success flag, first fatal error, and the per-task log of a run.
///
/// The log is ordered by completion: strictly the execution order in
/// sequential mode, arrival order on the results channel in pooled mode.
#[derive(Debug)]
pub struct ExecutionResult {
    status: RunStatus,
    first_error: Option<ExecutionError>,
    log: Vec<TaskReport>,
}

impl ExecutionResult {
    pub(crate) fn not_attempted(error: ExecutionError) -> Self {
        Self {
            status: RunStatus::NotAttempted,
            first_error: Some(error),
            log: Vec::new(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn first_error(&self) -> Option<&ExecutionError> {
        self.first_error.as_ref()
    }

    pub fn log(&self) -> &[TaskReport] {
        &self.log
    }

    pub fn report_for(&self, task: &str) -> Option<&TaskReport> {
        self.log.iter().find(|r| r.task == task)
    }

    /// Names of tasks that completed successfully, in log order.
    pub fn completed(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter(|r| r.succeeded())
            .map(|r| r.task.as_str())
            .collect()
    }

    /// Process exit code: `0` success, `1` task failure, `2` not attempted.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 1,
            RunStatus::NotAttempted => 2,
        }
    }

    pub fn into_first_error(self) -> Option<ExecutionError> {
        self.first_error
    }
}

/// Accumulates reports while the executor runs.
#[derive(Debug, Default)]
pub(crate) struct ResultBuilder {
    log: Vec<TaskReport>,
    first_error: Option<ExecutionError>,
}

impl ResultBuilder {
    pub(crate) fn record(&mut self, report: TaskReport, error: Option<ExecutionError>) {
        self.log.push(report);
        if let Some(error) = error {
            self.record_error(error);
        }
    }

    /// Keep `error` only if nothing failed before it.
    pub(crate) fn record_error(&mut self, error: ExecutionError) {
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    pub(crate) fn finish(self) -> ExecutionResult {
        let status = if self.first_error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        ExecutionResult {
            status,
            first_error: self.first_error,
            log: self.log,
        }
    }
}
