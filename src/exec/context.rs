// src/exec/context.rs

//! Context passed to every task invocation.
//!
//! [`RunContext`] is shared by all tasks of one run: the output registry,
//! immutable run variables, and an opaque [`Hooks`] bag. [`TaskContext`]
//! wraps it with what is specific to a single attempt of a single task.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::dag::TaskName;
use crate::errors::TaskError;
use crate::registry::{TaskRegistry, TaskValue};

/// Type-keyed side-effect helpers handed to tasks.
///
/// The engine never looks inside; it only passes the bag along.
#[derive(Clone, Default)]
pub struct Hooks {
    items: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the helper of type `T`.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.items.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.items
            .get(&TypeId::of::<T>())
            .and_then(|item| item.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("len", &self.items.len())
            .finish()
    }
}

/// State shared by every task in a run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    registry: TaskRegistry,
    vars: Arc<BTreeMap<String, String>>,
    hooks: Arc<Hooks>,
}

impl RunContext {
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry,
            vars: Arc::default(),
            hooks: Arc::default(),
        }
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = Arc::new(vars);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Same variables and hooks over a child registry scope.
    pub fn scoped(&self) -> RunContext {
        RunContext {
            registry: self.registry.scoped(),
            vars: Arc::clone(&self.vars),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

/// Per-attempt view handed to [`crate::exec::Task::run`].
#[derive(Debug, Clone)]
pub struct TaskContext {
    name: TaskName,
    explicit: bool,
    attempt: u32,
    dependencies: Vec<TaskName>,
    run: RunContext,
}

impl TaskContext {
    pub fn new(
        name: impl Into<TaskName>,
        explicit: bool,
        attempt: u32,
        dependencies: Vec<TaskName>,
        run: RunContext,
    ) -> Self {
        Self {
            name: name.into(),
            explicit,
            attempt,
            dependencies,
            run,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `false` when the task only runs because something downstream needs
    /// it; tasks may skip expensive work in that case.
    pub fn is_explicit_run(&self) -> bool {
        self.explicit
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    /// Output of a declared dependency.
    pub fn upstream(&self, dependency: &str) -> Result<TaskValue, TaskError> {
        if !self.dependencies.iter().any(|d| d == dependency) {
            return Err(TaskError::UndeclaredDependency(dependency.to_string()));
        }
        self.run
            .registry()
            .get(dependency)
            .map_err(|_| TaskError::MissingOutput(dependency.to_string()))
    }
}
