// src/config/validate.rs

use std::collections::HashMap;

use crate::config::model::ProjectFile;
use crate::dag::DagGraph;
use crate::errors::{CompileError, Result, RundagError};
use crate::exec::shell::env_key;

/// Run basic semantic validation against a loaded project.
///
/// This checks:
/// - there is at least one task
/// - `[config].threads >= 1`
/// - task names are unique and every `after` reference exists
/// - the task graph has no cycles
/// - no two dependencies of a task (and no two `[vars]` keys) map to the
///   same environment variable
///
/// Selection-dependent checks (unknown selected tasks, empty selection) are
/// left to the compiler.
pub fn validate_project(project: &ProjectFile) -> Result<()> {
    ensure_has_tasks(project)?;
    validate_global_config(project)?;
    validate_dag(project)?;
    validate_env_keys(project)?;
    Ok(())
}

fn ensure_has_tasks(project: &ProjectFile) -> Result<()> {
    if project.tasks.is_empty() {
        return Err(RundagError::ConfigError(
            "project must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(project: &ProjectFile) -> Result<()> {
    if project.config.threads == 0 {
        return Err(RundagError::ConfigError(
            "[config].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_dag(project: &ProjectFile) -> Result<()> {
    let graph = DagGraph::build(&project.descriptors())?;
    if let Some(cycle) = graph.find_cycle() {
        return Err(CompileError::CyclicDependency { cycle }.into());
    }
    Ok(())
}

fn validate_env_keys(project: &ProjectFile) -> Result<()> {
    for task in &project.tasks {
        let deps = task.descriptor.dependencies().iter().map(String::as_str);
        ensure_distinct_keys(
            "RUNDAG_UPSTREAM_",
            deps,
            &format!("dependencies of task '{}'", task.descriptor.identity()),
        )?;
    }
    ensure_distinct_keys("RUNDAG_VAR_", project.vars.keys().map(String::as_str), "[vars]")
}

fn ensure_distinct_keys<'a>(
    prefix: &str,
    names: impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for name in names {
        let key = env_key(prefix, name);
        if let Some(other) = seen.insert(key.clone(), name) {
            return Err(RundagError::ConfigError(format!(
                "{what}: '{other}' and '{name}' both map to environment variable {key}"
            )));
        }
    }
    Ok(())
}
