// src/dag/compiler.rs

//! Graph compiler: descriptors + user selection -> [`CompiledGraph`].

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::dag::{DagGraph, TaskDescriptor, TaskName};
use crate::errors::CompileError;

/// What the user asked to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Tasks named directly by the user.
    pub tasks: Vec<TaskName>,
    /// `--all-upstream`: run the full graph.
    pub all_upstream: bool,
    /// `--all-downstream`: run the full graph.
    pub all_downstream: bool,
}

impl Selection {
    pub fn tasks<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
            all_upstream: false,
            all_downstream: false,
        }
    }

    pub fn all_upstream(mut self, on: bool) -> Self {
        self.all_upstream = on;
        self
    }

    pub fn all_downstream(mut self, on: bool) -> Self {
        self.all_downstream = on;
        self
    }

    /// Whether either expansion flag is set.
    pub fn expands(&self) -> bool {
        self.all_upstream || self.all_downstream
    }
}

/// 1-based progress position shown to observers when a task starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayPosition {
    pub index: usize,
    pub total: usize,
}

/// Output of [`compile`]: the validated graph plus the orders derived from
/// it for one invocation. Read-only once built.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    descriptors: Vec<TaskDescriptor>,
    graph: DagGraph,
    topological_order: Vec<TaskName>,
    selected_order: Vec<TaskName>,
    explicit: HashSet<TaskName>,
    positions: HashMap<TaskName, DisplayPosition>,
    expanded: bool,
}

impl CompiledGraph {
    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Descriptors in discovery order.
    pub fn descriptors(&self) -> &[TaskDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&TaskDescriptor> {
        let ix = self.graph.position_of(name)?;
        self.descriptors.get(ix)
    }

    pub fn topological_order(&self) -> &[TaskName] {
        &self.topological_order
    }

    pub fn selected_order(&self) -> &[TaskName] {
        &self.selected_order
    }

    /// Whether the task was requested by the user rather than pulled in as a
    /// dependency.
    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    pub fn position(&self, name: &str) -> Option<DisplayPosition> {
        self.positions.get(name).copied()
    }

    /// Whether upstream/downstream expansion was active for this compile.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Compile descriptors into a validated graph and compute what to run.
///
/// Steps:
/// 1. reject duplicate identities and unresolved dependency names
/// 2. reject cycles (three-colour DFS)
/// 3. compute the global topological order (stable on discovery order)
/// 4. compute the selected order and which tasks are explicit
/// 5. precompute display positions
pub fn compile(
    descriptors: &[TaskDescriptor],
    selection: &Selection,
) -> Result<CompiledGraph, CompileError> {
    let graph = DagGraph::build(descriptors)?;
    let topological_order = graph.topological_order()?;

    let named = dedup_selection(&selection.tasks);
    for name in &named {
        if !graph.contains(name) {
            return Err(CompileError::UnknownSelection(name.clone()));
        }
    }

    let expanded = selection.expands();
    if named.is_empty() && !expanded {
        return Err(CompileError::NoTasksSelected);
    }

    let (selected_order, explicit) = if expanded {
        let explicit: HashSet<TaskName> = topological_order.iter().cloned().collect();
        (topological_order.clone(), explicit)
    } else {
        let needed = graph.with_ancestors(named.iter().map(String::as_str));
        let order: Vec<TaskName> = topological_order
            .iter()
            .filter(|name| needed.contains(*name))
            .cloned()
            .collect();
        (order, named.iter().cloned().collect())
    };

    let positions = display_positions(&topological_order, &named, expanded);

    debug!(
        total = topological_order.len(),
        selected = selected_order.len(),
        expanded,
        "compiled task graph"
    );

    Ok(CompiledGraph {
        descriptors: descriptors.to_vec(),
        graph,
        topological_order,
        selected_order,
        explicit,
        positions,
        expanded,
    })
}

/// Keep the first occurrence of each selected name.
fn dedup_selection(tasks: &[TaskName]) -> Vec<TaskName> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// Progress numbering.
///
/// - expansion active: index in the global topological order, out of the
///   graph size, for every task
/// - otherwise: index among the user-named tasks sorted by topological
///   position, out of the number of named tasks
///
/// Tasks pulled in only as dependencies get no position.
fn display_positions(
    topological_order: &[TaskName],
    named: &[TaskName],
    expanded: bool,
) -> HashMap<TaskName, DisplayPosition> {
    if expanded {
        let total = topological_order.len();
        return topological_order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), DisplayPosition { index: i + 1, total }))
            .collect();
    }

    let rank: HashMap<&str, usize> = topological_order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut sorted: Vec<&TaskName> = named.iter().collect();
    sorted.sort_by_key(|name| rank.get(name.as_str()).copied().unwrap_or(usize::MAX));

    let total = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), DisplayPosition { index: i + 1, total }))
        .collect()
}
