// src/exec/executor.rs

//! Concurrent DAG executor.
//!
//! Two scheduling modes:
//! - sequential (`concurrency == 1`): tasks run one after the other in
//!   selected order; the first failure stops the loop.
//! - pooled (`concurrency > 1`): a submission loop walks the selected order,
//!   waits for each task's dependencies, and hands it to a bounded worker
//!   pool. A failure (a panicking task included) trips a shared cancellation flag; no further task is
//!   submitted, in-flight tasks are allowed to finish.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::{CompiledGraph, TaskName};
use crate::errors::{ExecutionError, SchedulingError};
use crate::exec::context::RunContext;
use crate::exec::result::{ExecutionResult, ResultBuilder};
use crate::exec::runner::{Completion, TaskJob, run_one};
use crate::exec::task::TaskSet;

/// Pool-wide cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Completion state published by each pooled worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    fn is_finished(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Runs a [`CompiledGraph`] against a [`TaskSet`].
#[derive(Debug, Clone, Copy)]
pub struct DagExecutor {
    concurrency: usize,
}

impl Default for DagExecutor {
    fn default() -> Self {
        Self::sequential()
    }
}

impl DagExecutor {
    /// `concurrency` below 1 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn sequential() -> Self {
        Self { concurrency: 1 }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute the selected order of `graph`.
    ///
    /// Every selected task must have an implementation in `tasks`; otherwise
    /// nothing runs and the result is [`crate::exec::RunStatus::NotAttempted`].
    pub async fn execute(
        &self,
        graph: &CompiledGraph,
        tasks: &TaskSet,
        ctx: &RunContext,
    ) -> ExecutionResult {
        let queue = match prepare_jobs(graph, tasks) {
            Ok(queue) => queue,
            Err(err) => {
                warn!(error = %err, "pre-flight check failed; no task started");
                return ExecutionResult::not_attempted(err.into());
            }
        };

        info!(
            tasks = queue.len(),
            concurrency = self.concurrency,
            "starting DAG run"
        );

        let result = if self.concurrency == 1 {
            run_sequential(queue, ctx).await
        } else {
            run_pooled(queue, ctx, self.concurrency).await
        };

        info!(
            status = ?result.status(),
            completed = result.completed().len(),
            "DAG run finished"
        );
        result
    }
}

/// Resolve every selected task into a [`TaskJob`], in selected order.
fn prepare_jobs(graph: &CompiledGraph, tasks: &TaskSet) -> Result<VecDeque<TaskJob>, SchedulingError> {
    graph
        .selected_order()
        .iter()
        .map(|name| {
            let task = tasks
                .get(name)
                .ok_or_else(|| SchedulingError::MissingImplementation(name.clone()))?;
            let descriptor = graph
                .descriptor(name)
                .ok_or_else(|| SchedulingError::MissingImplementation(name.clone()))?;

            Ok(TaskJob {
                name: name.clone(),
                task,
                dependencies: descriptor.dependencies().to_vec(),
                retry: descriptor.retry(),
                explicit: graph.is_explicit(name),
                position: graph.position(name),
            })
        })
        .collect()
}

async fn run_sequential(queue: VecDeque<TaskJob>, ctx: &RunContext) -> ExecutionResult {
    let mut results = ResultBuilder::default();
    let total = queue.len();

    for (done, job) in queue.into_iter().enumerate() {
        let Completion { report, error } = run_one(&job, ctx).await;
        let failed = error.is_some();
        results.record(report, error);

        if failed {
            info!(
                task = %job.name,
                skipped = total - done - 1,
                "task failed; stopping sequential run"
            );
            break;
        }
    }

    results.finish()
}

async fn run_pooled(
    mut queue: VecDeque<TaskJob>,
    ctx: &RunContext,
    concurrency: usize,
) -> ExecutionResult {
    let mut results = ResultBuilder::default();
    let permits = Arc::new(Semaphore::new(concurrency));
    let cancel = CancellationFlag::new();
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<Completion>();

    let mut states: HashMap<TaskName, watch::Receiver<JobState>> = HashMap::new();
    let mut in_flight: BTreeSet<TaskName> = BTreeSet::new();
    let mut workers: JoinSet<TaskName> = JoinSet::new();
    // Ranked after every worker result, which all arrived before it.
    let mut submit_error: Option<ExecutionError> = None;

    'submit: while let Some(job) = queue.pop_front() {
        if cancel.is_cancelled() {
            debug!(remaining = queue.len() + 1, "run cancelled; no further submissions");
            break;
        }

        for dep in &job.dependencies {
            let Some(state) = states.get(dep) else {
                submit_error = Some(
                    SchedulingError::UnknownDependency {
                        task: job.name.clone(),
                        dependency: dep.clone(),
                    }
                    .into(),
                );
                cancel.cancel();
                break 'submit;
            };

            let mut state = state.clone();
            let finished = match state.wait_for(JobState::is_finished).await {
                Ok(s) => *s,
                // Sender dropped without publishing: the worker died.
                Err(_) => JobState::Failed,
            };

            if finished != JobState::Succeeded {
                debug!(
                    task = %job.name,
                    dependency = %dep,
                    "dependency did not succeed; halting submissions"
                );
                break 'submit;
            }
        }

        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };

        if cancel.is_cancelled() {
            debug!(task = %job.name, "run cancelled while waiting for a worker");
            break;
        }

        let (state_tx, state_rx) = watch::channel(JobState::Running);
        states.insert(job.name.clone(), state_rx);
        in_flight.insert(job.name.clone());

        debug!(task = %job.name, "submitting task to worker pool");

        let run = ctx.clone();
        let tx = report_tx.clone();
        let cancel = cancel.clone();
        workers.spawn(async move {
            let _permit = permit;
            let completion = run_one(&job, &run).await;

            let state = if completion.succeeded() {
                JobState::Succeeded
            } else {
                cancel.cancel();
                JobState::Failed
            };

            let _ = tx.send(completion);
            let _ = state_tx.send(state);
            job.name
        });
    }

    drop(report_tx);

    if !queue.is_empty() {
        debug!(skipped = queue.len(), "tasks never submitted");
    }

    // Let every submitted task finish.
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(name) => {
                in_flight.remove(&name);
            }
            // Task panics are caught in `run_one`; this only fires if the
            // worker itself died.
            Err(err) => {
                warn!(error = %err, "worker terminated abnormally");
                cancel.cancel();
            }
        }
    }

    // Pool teardown.
    workers.shutdown().await;

    while let Some(Completion { report, error }) = report_rx.recv().await {
        results.record(report, error);
    }

    if let Some(err) = submit_error {
        results.record_error(err);
    }

    for task in in_flight {
        results.record_error(ExecutionError::Scheduling(SchedulingError::WorkerPanicked(task)));
    }

    results.finish()
}
