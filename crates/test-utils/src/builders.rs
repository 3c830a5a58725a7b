#![allow(dead_code)]

use std::fmt::Write as _;
use std::time::Duration;

use rundag::dag::{RetryPolicy, TaskDescriptor};

/// Builder for `TaskDescriptor` to simplify test setup.
pub struct DescriptorBuilder {
    name: String,
    after: Vec<String>,
    retry: RetryPolicy,
}

impl DescriptorBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            after: vec![],
            retry: RetryPolicy::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.after.push(dep.to_string());
        self
    }

    pub fn retries(mut self, count: u32) -> Self {
        self.retry.count = count;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    pub fn build(self) -> TaskDescriptor {
        TaskDescriptor::new(self.name, self.after).with_retry(self.retry)
    }
}

/// `(name, deps)` pairs to descriptors, in the given (discovery) order.
pub fn descriptors(spec: &[(&str, &[&str])]) -> Vec<TaskDescriptor> {
    spec.iter()
        .map(|(name, deps)| TaskDescriptor::new(*name, deps.to_vec()))
        .collect()
}

/// The canonical `A <- B <- C` chain.
pub fn chain_abc() -> Vec<TaskDescriptor> {
    descriptors(&[("A", &[]), ("B", &["A"]), ("C", &["B"])])
}

/// Builder for project manifest TOML text.
pub struct ManifestBuilder {
    header: String,
    vars: Vec<(String, String)>,
    tasks: String,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            header: String::new(),
            vars: vec![],
            tasks: String::new(),
        }
    }

    /// Raw lines for the `[config]` section, e.g. `"threads = 4"`.
    pub fn config_line(mut self, line: &str) -> Self {
        self.header.push_str(line);
        self.header.push('\n');
        self
    }

    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.vars.push((key.to_string(), value.to_string()));
        self
    }

    /// Add `[task.<name>]` with `cmd` and any extra raw lines
    /// (e.g. `after = ["a", "b"]`).
    pub fn task(mut self, name: &str, cmd: &str, extra: &[&str]) -> Self {
        let _ = writeln!(self.tasks, "[task.{name}]");
        let _ = writeln!(self.tasks, "cmd = {cmd:?}");
        for line in extra {
            let _ = writeln!(self.tasks, "{line}");
        }
        self.tasks.push('\n');
        self
    }

    pub fn build(self) -> String {
        let mut out = String::new();
        if !self.header.is_empty() {
            out.push_str("[config]\n");
            out.push_str(&self.header);
            out.push('\n');
        }
        if !self.vars.is_empty() {
            out.push_str("[vars]\n");
            for (key, value) in &self.vars {
                let _ = writeln!(out, "{key} = {value:?}");
            }
            out.push('\n');
        }
        out.push_str(&self.tasks);
        out
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
