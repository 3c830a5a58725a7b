// src/exec/task.rs

//! The contract every executable task implements, and the set that maps task
//! names to implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::TaskName;
use crate::errors::TaskError;
use crate::exec::context::TaskContext;
use crate::registry::TaskValue;

/// Boxed future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskValue, TaskError>> + Send + 'a>>;

/// An executable unit of work.
///
/// The executor only sequences, retries and records tasks; what a task
/// computes is entirely up to the implementation. The returned value is
/// written to the registry under the task's name. Returning
/// `TaskValue::Null` counts as a failed attempt.
pub trait Task: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a>;
}

/// Adapter turning a synchronous closure into a [`Task`].
pub struct FnTask<F>(pub F);

impl<F> Task for FnTask<F>
where
    F: Fn(&TaskContext) -> Result<TaskValue, TaskError> + Send + Sync,
{
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move { (self.0)(ctx) })
    }
}

/// Task implementations keyed by task name.
#[derive(Clone, Default)]
pub struct TaskSet {
    tasks: BTreeMap<TaskName, Arc<dyn Task>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<TaskName>, task: impl Task + 'static) {
        self.tasks.insert(name.into(), Arc::new(task));
    }

    pub fn insert_arc(&mut self, name: impl Into<TaskName>, task: Arc<dyn Task>) {
        self.tasks.insert(name.into(), task);
    }

    pub fn with(mut self, name: impl Into<TaskName>, task: impl Task + 'static) -> Self {
        self.insert(name, task);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tasks.keys()).finish()
    }
}
