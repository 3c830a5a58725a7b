// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, CompileArgs, RunArgs};
use crate::config::loader::load_and_validate;
use crate::config::model::ProjectFile;
use crate::dag::{CompiledGraph, CompiledManifest, DagGraph};
use crate::engine::Project;
use crate::exec::{DagExecutor, ExecutionResult, TaskOutcome};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the project manifest, then dispatches to the chosen
/// subcommand. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let project = load_and_validate(&config_path)?;
    debug!(path = ?config_path, tasks = project.tasks.len(), "loaded project manifest");

    match args.command {
        Command::List => {
            print_task_list(&project)?;
            Ok(0)
        }
        Command::Compile(compile_args) => {
            compile_manifest(&project, &compile_args)?;
            Ok(0)
        }
        Command::Run(run_args) => run_project(project, &run_args).await,
    }
}

async fn run_project(mut file: ProjectFile, args: &RunArgs) -> Result<i32> {
    let threads = args.threads.unwrap_or(file.config.threads);
    for (key, value) in &args.vars {
        file.vars.insert(key.clone(), value.clone());
    }

    let project = Project::from_file(&file);
    let selection = args.selection.to_selection(file.task_names());
    let graph = project.compile(&selection)?;

    if let Some(path) = &args.manifest {
        CompiledManifest::from_graph(&graph).write_to(path)?;
        info!(path = ?path, "wrote compiled manifest");
    }

    if args.dry_run {
        print_plan(&graph, threads);
        return Ok(0);
    }

    let result = DagExecutor::new(threads)
        .execute(&graph, project.tasks(), project.context())
        .await;

    print_summary(&result);
    Ok(result.exit_code())
}

fn compile_manifest(file: &ProjectFile, args: &CompileArgs) -> Result<()> {
    let project = Project::from_file(file);
    let selection = args.selection.to_selection(file.task_names());
    let graph = project.compile(&selection)?;
    let manifest = CompiledManifest::from_graph(&graph);

    match &args.output {
        Some(path) => {
            manifest.write_to(path)?;
            info!(path = ?path, "wrote compiled manifest");
        }
        None => println!("{}", manifest.to_json_pretty()?),
    }
    Ok(())
}

/// Tasks in topological order with their dependencies.
fn print_task_list(file: &ProjectFile) -> Result<()> {
    let graph = DagGraph::build(&file.descriptors())?;
    let order = graph.topological_order()?;

    println!("tasks ({}):", order.len());
    for name in &order {
        let deps = graph.dependencies_of(name);
        if deps.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} (after: {})", deps.join(", "));
        }
    }
    Ok(())
}

fn print_plan(graph: &CompiledGraph, threads: usize) {
    println!("rundag dry-run");
    println!("  threads = {threads}");
    println!();

    println!("selected ({}):", graph.selected_order().len());
    for name in graph.selected_order() {
        let marker = if graph.is_explicit(name) { "*" } else { " " };
        match graph.position(name) {
            Some(pos) => println!("  {marker} {name} [{}/{}]", pos.index, pos.total),
            None => println!("  {marker} {name}"),
        }
    }
}

fn print_summary(result: &ExecutionResult) {
    for report in result.log() {
        match &report.outcome {
            TaskOutcome::Succeeded => println!(
                "ok      {} ({} attempt(s), {:.2}s)",
                report.task,
                report.attempts,
                report.duration.as_secs_f64()
            ),
            TaskOutcome::Failed(msg) => println!(
                "FAILED  {} ({} attempt(s)): {msg}",
                report.task, report.attempts
            ),
        }
    }

    match result.first_error() {
        None => println!("run succeeded: {} task(s) completed", result.completed().len()),
        Some(err) => println!("run {:?}: {err}", result.status()),
    }
}
