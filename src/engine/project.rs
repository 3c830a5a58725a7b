// src/engine/project.rs

use tracing::info;

use crate::config::ProjectFile;
use crate::dag::{CompiledGraph, Selection, TaskDescriptor, compile};
use crate::errors::CompileError;
use crate::exec::{DagExecutor, ExecutionResult, RunContext, TaskSet};
use crate::registry::TaskRegistry;

/// Descriptors, their implementations, and the context of one run-level
/// invocation.
///
/// The registry inside the context is write-once per task, so a `Project`
/// runs its graph once through [`Project::run`]; further runs (for example a
/// task graph started from inside another task) go through
/// [`Project::run_nested`], which works on a fresh scoped registry.
#[derive(Debug, Clone)]
pub struct Project {
    descriptors: Vec<TaskDescriptor>,
    tasks: TaskSet,
    context: RunContext,
}

/// Outcome of a nested run together with the scope it wrote into.
#[derive(Debug)]
pub struct NestedRun {
    pub result: ExecutionResult,
    pub context: RunContext,
}

impl NestedRun {
    /// Copy the nested run's outputs into the enclosing registry.
    pub fn merge(&self) -> usize {
        self.context.registry().merge_into_parent()
    }
}

impl Project {
    pub fn new(descriptors: Vec<TaskDescriptor>, tasks: TaskSet) -> Self {
        Self {
            descriptors,
            tasks,
            context: RunContext::new(TaskRegistry::new()),
        }
    }

    /// Project backed by shell tasks from a validated manifest.
    pub fn from_file(file: &ProjectFile) -> Self {
        Self {
            descriptors: file.descriptors(),
            tasks: file.task_set(),
            context: file.run_context(),
        }
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    pub fn descriptors(&self) -> &[TaskDescriptor] {
        &self.descriptors
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.context.registry()
    }

    pub fn compile(&self, selection: &Selection) -> Result<CompiledGraph, CompileError> {
        compile(&self.descriptors, selection)
    }

    /// Compile and execute against the project's own registry.
    ///
    /// Compile errors are returned before any task runs.
    pub async fn run(
        &self,
        selection: &Selection,
        concurrency: usize,
    ) -> Result<ExecutionResult, CompileError> {
        let graph = self.compile(selection)?;
        Ok(DagExecutor::new(concurrency)
            .execute(&graph, &self.tasks, &self.context)
            .await)
    }

    /// Compile and execute against a child scope of the project's registry.
    ///
    /// Upstream outputs already in the project registry are visible to the
    /// nested run; its own outputs stay in the child scope until
    /// [`NestedRun::merge`] is called.
    pub async fn run_nested(
        &self,
        selection: &Selection,
        concurrency: usize,
    ) -> Result<NestedRun, CompileError> {
        let graph = self.compile(selection)?;
        let context = self.context.scoped();

        info!(tasks = graph.selected_order().len(), "starting nested run");
        let result = DagExecutor::new(concurrency)
            .execute(&graph, &self.tasks, &context)
            .await;

        Ok(NestedRun { result, context })
    }
}
