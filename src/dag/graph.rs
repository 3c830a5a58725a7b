// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::TaskDescriptor;
use crate::errors::CompileError;

use super::TaskName;

/// DFS marking used by cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validated dependency graph keyed by task name.
///
/// Edge direction is `dependency -> dependent`. Node indices follow
/// discovery order (the order descriptors were handed to [`DagGraph::build`]),
/// which is what every tie-break in this module relies on.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<TaskName, ()>,
    index: HashMap<TaskName, NodeIndex>,
}

impl DagGraph {
    /// Build a graph from descriptors.
    ///
    /// Fails on duplicate identities and on dependencies that name a task not
    /// present in `descriptors`. Cycles are *not* rejected here; use
    /// [`DagGraph::find_cycle`] or [`DagGraph::topological_order`].
    pub fn build(descriptors: &[TaskDescriptor]) -> Result<Self, CompileError> {
        let mut graph: DiGraph<TaskName, ()> = DiGraph::with_capacity(descriptors.len(), 0);
        let mut index: HashMap<TaskName, NodeIndex> = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let name = descriptor.identity().to_string();
            if index.contains_key(&name) {
                return Err(CompileError::DuplicateTask(name));
            }
            let ix = graph.add_node(name.clone());
            index.insert(name, ix);
        }

        for descriptor in descriptors {
            let task_ix = index[descriptor.identity()];
            for dep in descriptor.dependencies() {
                let dep_ix = index.get(dep).copied().ok_or_else(|| {
                    CompileError::UnresolvedReference {
                        task: descriptor.identity().to_string(),
                        dependency: dep.clone(),
                    }
                })?;
                graph.add_edge(dep_ix, task_ix, ());
            }
        }

        Ok(Self { graph, index })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Discovery position of a task.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|ix| ix.index())
    }

    /// All task names in discovery order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|ix| self.graph[ix].as_str())
    }

    /// Immediate dependencies of a task, in discovery order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Incoming)
    }

    /// Immediate dependents of a task, in discovery order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing)
    }

    /// All `(dependency, dependent)` pairs, sorted by discovery order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .collect();
        pairs.sort();
        pairs
            .into_iter()
            .map(|(a, b)| (self.graph[a].as_str(), self.graph[b].as_str()))
            .collect()
    }

    /// Look for a cycle with a three-colour depth-first traversal.
    ///
    /// Returns the cycle as a closed path (`A -> B -> A` yields
    /// `["A", "B", "A"]`), or `None` if the graph is acyclic.
    pub fn find_cycle(&self) -> Option<Vec<TaskName>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];

        for start in self.graph.node_indices() {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }

            marks[start.index()] = Mark::InProgress;
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> =
                vec![(start, self.successors_for_dfs(start))];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(next) = frame.1.pop() else {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                };

                match marks[next.index()] {
                    Mark::Unvisited => {
                        marks[next.index()] = Mark::InProgress;
                        stack.push((next, self.successors_for_dfs(next)));
                    }
                    Mark::InProgress => {
                        // Back edge: the grey path from `next` to the top of the
                        // stack is the cycle.
                        let from = stack
                            .iter()
                            .position(|(ix, _)| *ix == next)
                            .unwrap_or(0);
                        let mut cycle: Vec<TaskName> = stack[from..]
                            .iter()
                            .map(|(ix, _)| self.graph[*ix].clone())
                            .collect();
                        cycle.push(self.graph[next].clone());
                        return Some(cycle);
                    }
                    Mark::Done => {}
                }
            }
        }

        None
    }

    /// Global topological order (Kahn's algorithm).
    ///
    /// Among tasks that are ready at the same time, the one discovered first
    /// is emitted first, so the order is stable across compiles.
    pub fn topological_order(&self) -> Result<Vec<TaskName>, CompileError> {
        if let Some(cycle) = self.find_cycle() {
            return Err(CompileError::CyclicDependency { cycle });
        }

        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|ix| {
                self.graph
                    .neighbors_directed(ix, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(i)) = ready.pop() {
            let ix = NodeIndex::new(i);
            order.push(self.graph[ix].clone());

            for dependent in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                let deg = &mut in_degree[dependent.index()];
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(dependent.index()));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            // Unreachable after find_cycle, kept so the function stays total.
            let stuck = self
                .graph
                .node_indices()
                .find(|ix| in_degree[ix.index()] > 0)
                .map(|ix| self.graph[ix].clone())
                .unwrap_or_default();
            return Err(CompileError::CyclicDependency { cycle: vec![stuck] });
        }

        Ok(order)
    }

    /// The given tasks plus every task they transitively depend on.
    ///
    /// Unknown names are ignored.
    pub fn with_ancestors<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> HashSet<TaskName> {
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<NodeIndex> = roots
            .into_iter()
            .filter_map(|name| self.index.get(name).copied())
            .collect();

        while let Some(ix) = stack.pop() {
            if !seen.insert(ix) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(ix, Direction::Incoming));
        }

        seen.into_iter().map(|ix| self.graph[ix].clone()).collect()
    }

    fn neighbours(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&ix) = self.index.get(name) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(ix, direction).collect();
        found.sort();
        found
            .into_iter()
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    /// Successors sorted so that popping yields the lowest discovery index
    /// first.
    fn successors_for_dfs(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .collect();
        next.sort_by(|a, b| b.cmp(a));
        next
    }
}
