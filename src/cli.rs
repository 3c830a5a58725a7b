// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dag::Selection;

/// Command-line arguments for `rundag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rundag",
    version,
    about = "Compile a project of dependent tasks into a DAG and run it.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project manifest (TOML).
    ///
    /// Default: `Rundag.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "Rundag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile the project and run the selected tasks.
    Run(RunArgs),
    /// Compile the project and print (or write) the compiled manifest.
    Compile(CompileArgs),
    /// List tasks in topological order with their dependencies.
    List,
}

/// Which tasks to run.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Tasks to run. Their dependencies run too. Omit to run every task.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Run the full graph up to and including the named tasks.
    #[arg(long)]
    pub all_upstream: bool,

    /// Run the full graph from the named tasks onward.
    #[arg(long)]
    pub all_downstream: bool,
}

impl SelectionArgs {
    /// Build a [`Selection`]; with no task names and no expansion flag every
    /// project task is selected.
    pub fn to_selection<'a>(&self, all_tasks: impl Iterator<Item = &'a str>) -> Selection {
        let tasks: Vec<String> = if self.tasks.is_empty() && !self.all_upstream && !self.all_downstream {
            all_tasks.map(str::to_string).collect()
        } else {
            self.tasks.clone()
        };

        Selection::tasks(tasks)
            .all_upstream(self.all_upstream)
            .all_downstream(self.all_downstream)
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Number of worker threads; overrides `[config].threads`.
    #[arg(long, value_name = "N", value_parser = parse_threads)]
    pub threads: Option<usize>,

    /// Run variable exposed to tasks; overrides `[vars]`. Repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Also write the compiled manifest to this path.
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Compile and print the execution plan, but don't run any task.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Write the manifest here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("invalid thread count: {s}"))?;
    if n == 0 {
        return Err("thread count must be >= 1".to_string());
    }
    Ok(n)
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid variable '{s}' (expected KEY=VALUE)")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
