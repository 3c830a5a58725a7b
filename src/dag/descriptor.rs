// src/dag/descriptor.rs

//! Immutable task descriptors produced by task discovery.

use std::time::Duration;

use super::TaskName;

/// Declared dependencies of a task, before normalization.
///
/// Discovery layers may hand over nothing, a single name, or a list. All
/// three shapes collapse into one ordered list on [`TaskDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DependencySpec {
    #[default]
    None,
    One(TaskName),
    Many(Vec<TaskName>),
}

impl From<&str> for DependencySpec {
    fn from(name: &str) -> Self {
        DependencySpec::One(name.to_string())
    }
}

impl From<String> for DependencySpec {
    fn from(name: String) -> Self {
        DependencySpec::One(name)
    }
}

impl From<Vec<String>> for DependencySpec {
    fn from(names: Vec<String>) -> Self {
        DependencySpec::Many(names)
    }
}

impl From<Vec<&str>> for DependencySpec {
    fn from(names: Vec<&str>) -> Self {
        DependencySpec::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DependencySpec {
    fn from(names: [&str; N]) -> Self {
        DependencySpec::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

impl DependencySpec {
    /// Flatten into an ordered list, dropping repeated names.
    fn normalize(self) -> Vec<TaskName> {
        let names = match self {
            DependencySpec::None => Vec::new(),
            DependencySpec::One(name) => vec![name],
            DependencySpec::Many(names) => names,
        };

        let mut out: Vec<TaskName> = Vec::with_capacity(names.len());
        for name in names {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// How often a failing task is retried, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub count: u32,
    /// Delay before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(count: u32, delay: Duration) -> Self {
        Self { count, delay }
    }

    /// Build a policy from a delay expressed in (fractional) seconds, as found
    /// in project manifests.
    pub fn from_seconds(count: u32, delay_seconds: f64) -> Result<Self, String> {
        if !delay_seconds.is_finite() {
            return Err(format!("retry delay must be finite (got {delay_seconds})"));
        }
        if delay_seconds < 0.0 {
            return Err(format!(
                "retry delay must be non-negative (got {delay_seconds})"
            ));
        }
        Ok(Self::new(count, Duration::from_secs_f64(delay_seconds)))
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.count.saturating_add(1)
    }
}

/// Identity, dependencies and retry policy of one task.
///
/// Created once per compile pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    identity: TaskName,
    dependencies: Vec<TaskName>,
    retry: RetryPolicy,
}

impl TaskDescriptor {
    pub fn new(identity: impl Into<TaskName>, dependencies: impl Into<DependencySpec>) -> Self {
        Self {
            identity: identity.into(),
            dependencies: dependencies.into().normalize(),
            retry: RetryPolicy::default(),
        }
    }

    /// Descriptor for a task with no dependencies.
    pub fn root(identity: impl Into<TaskName>) -> Self {
        Self::new(identity, DependencySpec::None)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}
