// src/exec/runner.rs

//! Runs a single task to completion, including retries.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::dag::{DisplayPosition, RetryPolicy, TaskName};
use crate::errors::{ExecutionError, SchedulingError, TaskError};
use crate::exec::context::{RunContext, TaskContext};
use crate::exec::result::{TaskOutcome, TaskReport};
use crate::exec::task::Task;
use crate::registry::TaskValue;

/// Everything the executor needs to run one task, resolved before the run
/// starts.
#[derive(Clone)]
pub struct TaskJob {
    pub name: TaskName,
    pub task: Arc<dyn Task>,
    pub dependencies: Vec<TaskName>,
    pub retry: RetryPolicy,
    pub explicit: bool,
    pub position: Option<DisplayPosition>,
}

impl std::fmt::Debug for TaskJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskJob")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry", &self.retry)
            .field("explicit", &self.explicit)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Result of [`run_one`]: the log entry plus the fatal error, if any.
#[derive(Debug)]
pub struct Completion {
    pub report: TaskReport,
    pub error: Option<ExecutionError>,
}

impl Completion {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Run `job` with up to `retry.count + 1` attempts.
///
/// Sleeps `retry.delay` before every attempt after the first. The first
/// successful attempt's value is written to the registry; failed attempts
/// never touch it.
pub async fn run_one(job: &TaskJob, run: &RunContext) -> Completion {
    let started = Instant::now();
    let max_attempts = job.retry.max_attempts();

    match job.position {
        Some(pos) => info!(
            task = %job.name,
            position = %format_args!("{}/{}", pos.index, pos.total),
            "task started"
        ),
        None => info!(task = %job.name, explicit = job.explicit, "task started"),
    }

    let mut attempt: u32 = 0;
    let failure = loop {
        attempt += 1;

        if attempt > 1 {
            warn!(
                task = %job.name,
                attempt,
                max_attempts,
                delay_ms = job.retry.delay.as_millis() as u64,
                "retrying task"
            );
            if !job.retry.delay.is_zero() {
                tokio::time::sleep(job.retry.delay).await;
            }
        }

        let outcome = match attempt_once(job, run, attempt).await {
            Ok(outcome) => outcome,
            Err(panicked) => break panicked,
        };

        match outcome {
            Ok(value) => {
                if let Err(err) = run.registry().set(job.name.clone(), value) {
                    break ExecutionError::Scheduling(SchedulingError::from(err));
                }
                info!(
                    task = %job.name,
                    attempts = attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "task succeeded"
                );
                return Completion {
                    report: report(job, attempt, started, TaskOutcome::Succeeded),
                    error: None,
                };
            }
            Err(err) if attempt < max_attempts => {
                debug!(task = %job.name, attempt, error = %err, "attempt failed");
            }
            Err(err) => {
                break ExecutionError::Task {
                    task: job.name.clone(),
                    attempts: attempt,
                    source: err,
                };
            }
        }
    };

    warn!(task = %job.name, attempts = attempt, error = %failure, "task failed");
    Completion {
        report: report(
            job,
            attempt,
            started,
            TaskOutcome::Failed(failure.to_string()),
        ),
        error: Some(failure),
    }
}

/// One attempt, on its own tokio task so that a panicking implementation
/// surfaces as [`SchedulingError::WorkerPanicked`] instead of unwinding
/// through the executor. Panics are not retried.
async fn attempt_once(
    job: &TaskJob,
    run: &RunContext,
    attempt: u32,
) -> Result<Result<TaskValue, TaskError>, ExecutionError> {
    let ctx = TaskContext::new(
        job.name.clone(),
        job.explicit,
        attempt,
        job.dependencies.clone(),
        run.clone(),
    );
    let task = Arc::clone(&job.task);

    let handle = tokio::spawn(async move { task.run(&ctx).await });

    match handle.await {
        Ok(Ok(TaskValue::Null)) => Ok(Err(TaskError::NullOutput)),
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_panic() => {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(task = %job.name, attempt, panic = %message, "task panicked");
            Err(SchedulingError::WorkerPanicked(job.name.clone()).into())
        }
        Err(err) => Ok(Err(TaskError::failed(format!("task was aborted: {err}")))),
    }
}

fn report(job: &TaskJob, attempts: u32, started: Instant, outcome: TaskOutcome) -> TaskReport {
    TaskReport {
        task: job.name.clone(),
        attempts,
        duration: started.elapsed(),
        outcome,
        explicit: job.explicit,
        position: job.position,
    }
}
