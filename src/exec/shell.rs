// src/exec/shell.rs

//! Shell command tasks, used for tasks defined in a project manifest.

use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::TaskError;
use crate::exec::context::TaskContext;
use crate::exec::task::{Task, TaskFuture};
use crate::registry::TaskValue;

/// Number of stderr lines kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Runs `cmd` through the platform shell.
///
/// Environment exposed to the command:
/// - `RUNDAG_TASK`: the task name
/// - `RUNDAG_EXPLICIT`: `1` if the task was requested directly, else `0`
/// - `RUNDAG_ATTEMPT`: 1-based attempt number
/// - `RUNDAG_UPSTREAM_<NAME>`: output of each declared dependency
/// - `RUNDAG_VAR_<KEY>`: each run variable
///
/// The output value is trimmed stdout, parsed as JSON when possible and kept
/// as a string otherwise (a bare `null` stays the string `"null"`). A task
/// with a `target` always outputs the target string, whether or not its
/// command ran.
#[derive(Debug, Clone)]
pub struct ShellTask {
    cmd: String,
    target: Option<String>,
}

impl ShellTask {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            target: None,
        }
    }

    /// Location the task's output lives at, and its output value. When the
    /// task only runs as a dependency the command is skipped.
    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn execute(&self, ctx: &TaskContext) -> Result<TaskValue, TaskError> {
        if !ctx.is_explicit_run() {
            if let Some(target) = &self.target {
                debug!(
                    task = %ctx.name(),
                    target = %target,
                    "running as dependency only; using target as output"
                );
                return Ok(TaskValue::String(target.clone()));
            }
        }

        let mut cmd = shell_command(&self.cmd);
        cmd.env("RUNDAG_TASK", ctx.name())
            .env("RUNDAG_EXPLICIT", if ctx.is_explicit_run() { "1" } else { "0" })
            .env("RUNDAG_ATTEMPT", ctx.attempt().to_string());

        for dep in ctx.dependencies() {
            let value = ctx.upstream(dep)?;
            cmd.env(env_key("RUNDAG_UPSTREAM_", dep), value_as_env(&value));
        }
        for (key, value) in ctx.run().vars() {
            cmd.env(env_key("RUNDAG_VAR_", key), value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(task = %ctx.name(), cmd = %self.cmd, attempt = ctx.attempt(), "starting task process");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running process for task '{}'", ctx.name()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!(task = %ctx.name(), "stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(TaskError::failed(failure_message(code, &stderr)));
        }

        match &self.target {
            Some(target) => Ok(TaskValue::String(target.clone())),
            None => Ok(parse_output(stdout.trim())),
        }
    }
}

impl Task for ShellTask {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(self.execute(ctx))
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// `prefix` + upper-cased name with every non-alphanumeric byte as `_`.
pub fn env_key(prefix: &str, name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}{suffix}")
}

fn value_as_env(value: &TaskValue) -> String {
    match value {
        TaskValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn parse_output(stdout: &str) -> TaskValue {
    match serde_json::from_str(stdout) {
        Ok(TaskValue::Null) | Err(_) => TaskValue::String(stdout.to_string()),
        Ok(value) => value,
    }
}

fn failure_message(code: i32, stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
    if tail.is_empty() {
        format!("command exited with code {code}")
    } else {
        format!("command exited with code {code}: {}", tail.join(" | "))
    }
}
