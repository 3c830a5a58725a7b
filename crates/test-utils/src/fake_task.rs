use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rundag::errors::TaskError;
use rundag::exec::{Task, TaskContext, TaskFuture, TaskSet};
use rundag::registry::TaskValue;
use serde_json::json;

/// Shared recorder for what fake tasks did during a run.
///
/// - start order (one entry per attempt)
/// - finish order (one entry per attempt)
/// - attempts per task
/// - peak number of tasks running at once
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

#[derive(Default)]
struct RecorderInner {
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    attempts: Mutex<HashMap<String, u32>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.inner.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.inner.finished.lock().unwrap().clone()
    }

    pub fn attempts(&self, task: &str) -> u32 {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .get(task)
            .copied()
            .unwrap_or(0)
    }

    pub fn was_started(&self, task: &str) -> bool {
        self.attempts(task) > 0
    }

    pub fn max_running(&self) -> usize {
        self.inner.max_running.load(Ordering::SeqCst)
    }

    fn enter(&self, task: &str) {
        self.inner.started.lock().unwrap().push(task.to_string());
        *self
            .inner
            .attempts
            .lock()
            .unwrap()
            .entry(task.to_string())
            .or_insert(0) += 1;

        let now = self.inner.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_running.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self, task: &str) {
        self.inner.running.fetch_sub(1, Ordering::SeqCst);
        self.inner.finished.lock().unwrap().push(task.to_string());
    }
}

#[derive(Clone)]
enum Script {
    /// Return this value on every attempt.
    Succeed(TaskValue),
    /// Fail the first `n` attempts, then return the value.
    FailTimes(u32, TaskValue),
    /// Fail every attempt with this message.
    AlwaysFail(String),
    /// Return `null`.
    Null,
    /// Panic inside the task body.
    Panic,
    /// Return `"<name>(<upstream values joined by ,>)"`.
    Upstream,
}

/// A fake task that:
/// - records its attempts on a [`Recorder`]
/// - optionally sleeps before producing a result
/// - succeeds, fails or misbehaves according to its script
#[derive(Clone)]
pub struct ScriptedTask {
    script: Script,
    delay: Duration,
    recorder: Recorder,
}

impl ScriptedTask {
    fn new(script: Script, recorder: &Recorder) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            recorder: recorder.clone(),
        }
    }

    pub fn succeed(recorder: &Recorder, value: TaskValue) -> Self {
        Self::new(Script::Succeed(value), recorder)
    }

    pub fn fail_times(recorder: &Recorder, failures: u32, value: TaskValue) -> Self {
        Self::new(Script::FailTimes(failures, value), recorder)
    }

    pub fn always_fail(recorder: &Recorder, message: &str) -> Self {
        Self::new(Script::AlwaysFail(message.to_string()), recorder)
    }

    pub fn null(recorder: &Recorder) -> Self {
        Self::new(Script::Null, recorder)
    }

    pub fn panic(recorder: &Recorder) -> Self {
        Self::new(Script::Panic, recorder)
    }

    pub fn upstream(recorder: &Recorder) -> Self {
        Self::new(Script::Upstream, recorder)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskValue, TaskError> {
        self.recorder.enter(ctx.name());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = self.evaluate(ctx);
        self.recorder.exit(ctx.name());
        result
    }

    fn evaluate(&self, ctx: &TaskContext) -> Result<TaskValue, TaskError> {
        match &self.script {
            Script::Succeed(value) => Ok(value.clone()),
            Script::FailTimes(n, value) => {
                if ctx.attempt() <= *n {
                    Err(TaskError::failed(format!("scripted failure {}", ctx.attempt())))
                } else {
                    Ok(value.clone())
                }
            }
            Script::AlwaysFail(message) => Err(TaskError::failed(message.clone())),
            Script::Null => Ok(TaskValue::Null),
            Script::Panic => panic!("scripted panic in '{}'", ctx.name()),
            Script::Upstream => {
                let mut parts = Vec::new();
                for dep in ctx.dependencies() {
                    match ctx.upstream(dep)? {
                        TaskValue::String(s) => parts.push(s),
                        other => parts.push(other.to_string()),
                    }
                }
                Ok(json!(format!("{}({})", ctx.name(), parts.join(","))))
            }
        }
    }
}

impl Task for ScriptedTask {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(self.execute(ctx))
    }
}

/// A `TaskSet` where every named task succeeds with its own name as value.
pub fn succeeding_tasks(recorder: &Recorder, names: &[&str]) -> TaskSet {
    let mut set = TaskSet::new();
    for name in names {
        set.insert(*name, ScriptedTask::succeed(recorder, json!(name)));
    }
    set
}

/// Like [`succeeding_tasks`] but every task sleeps `delay` first.
pub fn slow_tasks(recorder: &Recorder, names: &[&str], delay: Duration) -> TaskSet {
    let mut set = TaskSet::new();
    for name in names {
        set.insert(
            *name,
            ScriptedTask::succeed(recorder, json!(name)).with_delay(delay),
        );
    }
    set
}
