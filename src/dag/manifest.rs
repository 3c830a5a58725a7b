// src/dag/manifest.rs

//! Serializable snapshot of a [`CompiledGraph`] for external inspection.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dag::{CompiledGraph, TaskName};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    pub name: TaskName,
    pub dependencies: Vec<TaskName>,
    pub retries: u32,
    pub retry_delay_seconds: f64,
    pub explicit: bool,
    /// `[index, total]` progress position, if the task has one.
    pub position: Option<(usize, usize)>,
}

/// Compiled manifest: nodes in discovery order, edges as
/// `[dependency, dependent]` pairs, and both orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledManifest {
    pub nodes: Vec<ManifestNode>,
    pub edges: Vec<(TaskName, TaskName)>,
    pub topological_order: Vec<TaskName>,
    pub selected_order: Vec<TaskName>,
}

impl CompiledManifest {
    pub fn from_graph(graph: &CompiledGraph) -> Self {
        let nodes = graph
            .descriptors()
            .iter()
            .map(|d| ManifestNode {
                name: d.identity().to_string(),
                dependencies: d.dependencies().to_vec(),
                retries: d.retry().count,
                retry_delay_seconds: d.retry().delay.as_secs_f64(),
                explicit: graph.is_explicit(d.identity()),
                position: graph.position(d.identity()).map(|p| (p.index, p.total)),
            })
            .collect();

        let edges = graph
            .graph()
            .edges()
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            nodes,
            edges,
            topological_order: graph.topological_order().to_vec(),
            selected_order: graph.selected_order().to_vec(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
