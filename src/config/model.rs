// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::{DependencySpec, RetryPolicy, TaskDescriptor, TaskName};
use crate::errors::{CompileError, RundagError};
use crate::exec::{RunContext, ShellTask, TaskSet};
use crate::registry::TaskRegistry;

/// Project manifest as read from a TOML file.
///
/// ```toml
/// [config]
/// threads = 4
/// retries = 1
/// retry_delay_seconds = 0.5
///
/// [vars]
/// env = "dev"
///
/// [task.extract]
/// cmd = "echo extracted"
///
/// [task.load]
/// cmd = "echo loaded"
/// after = "extract"
/// ```
///
/// Tasks are kept as a raw table so that their file order (the discovery
/// order used for tie-breaking) survives deserialization, and so that a
/// malformed `after` can be reported as a compile error rather than a parse
/// error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProjectFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default)]
    pub task: toml::Table,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Worker pool size; `1` runs tasks sequentially.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Default retry count for tasks that do not set `retries`.
    #[serde(default)]
    pub retries: u32,

    /// Default retry delay for tasks that do not set `retry_delay_seconds`.
    #[serde(default)]
    pub retry_delay_seconds: f64,
}

fn default_threads() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            retries: 0,
            retry_delay_seconds: 0.0,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute.
    pub cmd: String,

    /// Dependencies: a task name, a list of task names, or absent.
    #[serde(default)]
    pub after: Option<toml::Value>,

    #[serde(default)]
    pub retries: Option<u32>,

    #[serde(default)]
    pub retry_delay_seconds: Option<f64>,

    /// Placeholder output used when the task only runs as a dependency.
    #[serde(default)]
    pub target: Option<String>,
}

/// One validated task: its descriptor plus how to run it.
#[derive(Debug, Clone)]
pub struct ProjectTask {
    pub descriptor: TaskDescriptor,
    pub cmd: String,
    pub target: Option<String>,
}

/// Validated project, tasks in file order.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub config: ConfigSection,
    pub vars: BTreeMap<String, String>,
    pub tasks: Vec<ProjectTask>,
}

impl ProjectFile {
    /// Task descriptors in discovery (file) order.
    pub fn descriptors(&self) -> Vec<TaskDescriptor> {
        self.tasks.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.descriptor.identity())
    }

    /// Shell implementations for every task.
    pub fn task_set(&self) -> TaskSet {
        let mut set = TaskSet::new();
        for task in &self.tasks {
            set.insert(
                task.descriptor.identity(),
                ShellTask::new(task.cmd.clone()).with_target(task.target.clone()),
            );
        }
        set
    }

    /// Fresh run context carrying the `[vars]` table.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(TaskRegistry::new()).with_vars(self.vars.clone())
    }
}

impl TryFrom<RawProjectFile> for ProjectFile {
    type Error = RundagError;

    fn try_from(raw: RawProjectFile) -> Result<Self, Self::Error> {
        let mut tasks = Vec::with_capacity(raw.task.len());

        for (name, value) in raw.task {
            let cfg: TaskConfig = value.try_into()?;
            let deps = normalize_after(&name, cfg.after)?;

            let retries = cfg.retries.unwrap_or(raw.config.retries);
            let delay = cfg
                .retry_delay_seconds
                .unwrap_or(raw.config.retry_delay_seconds);
            let retry = RetryPolicy::from_seconds(retries, delay).map_err(|reason| {
                CompileError::InvalidRetryPolicy {
                    task: name.clone(),
                    reason,
                }
            })?;

            tasks.push(ProjectTask {
                descriptor: TaskDescriptor::new(name, deps).with_retry(retry),
                cmd: cfg.cmd,
                target: cfg.target,
            });
        }

        Ok(Self {
            config: raw.config,
            vars: raw.vars,
            tasks,
        })
    }
}

/// Normalize the `after` field into a [`DependencySpec`].
///
/// Accepts a string or an array of strings; any other shape is
/// [`CompileError::InvalidDependencyType`].
pub fn normalize_after(task: &str, after: Option<toml::Value>) -> Result<DependencySpec, CompileError> {
    let invalid = |found: String| CompileError::InvalidDependencyType {
        task: task.to_string(),
        found,
    };

    match after {
        None => Ok(DependencySpec::None),
        Some(toml::Value::String(name)) => Ok(DependencySpec::One(name)),
        Some(toml::Value::Array(items)) => {
            let mut names: Vec<TaskName> = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    toml::Value::String(name) => names.push(name),
                    other => return Err(invalid(format!("array containing {}", other.type_str()))),
                }
            }
            Ok(DependencySpec::Many(names))
        }
        Some(other) => Err(invalid(other.type_str().to_string())),
    }
}
