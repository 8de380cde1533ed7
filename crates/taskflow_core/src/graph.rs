//! Task dependency graph.
//!
//! # Responsibility
//! - Hold prerequisite edges in both directions for O(log n) lookups.
//! - Detect cycles and produce a stable execution order.
//!
//! # Invariants
//! - `edges` and `reverse_edges` always describe the same edge set.
//! - Edges added through [`DependencyGraph::add_edge`] never close a cycle.
//! - Iteration order is by task ID, so results are deterministic.

use crate::model::task::{Task, TaskId};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    SelfDependency(TaskId),
    /// Adding the edge would close this cycle; first and last IDs are equal.
    CycleDetected { path: Vec<TaskId> },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfDependency(id) => write!(f, "task {id} cannot depend on itself"),
            Self::CycleDetected { path } => write!(f, "dependency cycle: {}", format_path(path)),
        }
    }
}

impl Error for GraphError {}

/// Directed graph where an edge `task -> prerequisite` means "task waits for prerequisite".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// task -> prerequisites it waits for.
    edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
    /// prerequisite -> tasks waiting for it.
    reverse_edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from raw edges without cycle checks.
    ///
    /// Use [`DependencyGraph::find_cycle`] to audit the result.
    pub fn from_edges(edges: impl IntoIterator<Item = (TaskId, TaskId)>) -> Self {
        let mut graph = Self::new();
        for (task, prerequisite) in edges {
            graph.insert_edge(task, prerequisite);
        }
        graph
    }

    /// Builds a graph from the `dependencies` lists of `tasks`.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self::from_edges(tasks.iter().flat_map(|task| {
            task.dependencies
                .iter()
                .map(move |prerequisite| (task.id, *prerequisite))
        }))
    }

    /// Adds `task -> prerequisite`, rejecting self edges and cycles.
    pub fn add_edge(&mut self, task: TaskId, prerequisite: TaskId) -> Result<(), GraphError> {
        if task == prerequisite {
            return Err(GraphError::SelfDependency(task));
        }
        if let Some(mut path) = self.path_between(prerequisite, task) {
            path.insert(0, task);
            return Err(GraphError::CycleDetected { path });
        }
        self.insert_edge(task, prerequisite);
        Ok(())
    }

    pub fn remove_edge(&mut self, task: TaskId, prerequisite: TaskId) {
        remove_from(&mut self.edges, task, prerequisite);
        remove_from(&mut self.reverse_edges, prerequisite, task);
    }

    /// Drops every edge touching `task`.
    pub fn remove_task(&mut self, task: TaskId) {
        for prerequisite in self.prerequisites_of(task) {
            self.remove_edge(task, prerequisite);
        }
        for dependent in self.dependents_of(task) {
            self.remove_edge(dependent, task);
        }
    }

    pub fn contains_edge(&self, task: TaskId, prerequisite: TaskId) -> bool {
        self.edges
            .get(&task)
            .is_some_and(|prerequisites| prerequisites.contains(&prerequisite))
    }

    pub fn prerequisites_of(&self, task: TaskId) -> Vec<TaskId> {
        self.edges
            .get(&task)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tasks directly waiting for `task`.
    pub fn dependents_of(&self, task: TaskId) -> Vec<TaskId> {
        self.reverse_edges
            .get(&task)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Every task that appears on either side of an edge.
    pub fn nodes(&self) -> BTreeSet<TaskId> {
        self.edges
            .keys()
            .chain(self.reverse_edges.keys())
            .copied()
            .collect()
    }

    /// Returns whether adding `task -> prerequisite` would close a cycle.
    pub fn would_create_cycle(&self, task: TaskId, prerequisite: TaskId) -> bool {
        task == prerequisite || self.path_between(prerequisite, task).is_some()
    }

    /// All direct and indirect prerequisites of `task`.
    pub fn transitive_prerequisites(&self, task: TaskId) -> BTreeSet<TaskId> {
        let mut seen = BTreeSet::new();
        let mut stack = self.prerequisites_of(task);
        while let Some(current) = stack.pop() {
            if current != task && seen.insert(current) {
                stack.extend(self.prerequisites_of(current));
            }
        }
        seen
    }

    /// Finds one cycle, if any. The returned path starts and ends on the same task.
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for node in self.nodes() {
            if marks.contains_key(&node) {
                continue;
            }
            if let Some(cycle) = self.visit(node, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// Orders tasks so prerequisites come before their dependents.
    ///
    /// Among tasks that are ready at the same time the smaller ID goes first.
    /// Fails with the offending cycle when the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, GraphError> {
        let nodes = self.nodes();
        let mut remaining: BTreeMap<TaskId, usize> = nodes
            .iter()
            .map(|node| (*node, self.edges.get(node).map_or(0, BTreeSet::len)))
            .collect();
        let mut ready: BTreeSet<TaskId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(node) = ready.pop_first() {
            order.push(node);
            for dependent in self.dependents_of(node) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let path = self.find_cycle().unwrap_or_default();
            return Err(GraphError::CycleDetected { path });
        }
        Ok(order)
    }

    fn insert_edge(&mut self, task: TaskId, prerequisite: TaskId) {
        self.edges.entry(task).or_default().insert(prerequisite);
        self.reverse_edges
            .entry(prerequisite)
            .or_default()
            .insert(task);
    }

    /// Depth-first search for a prerequisite chain `from -> ... -> to`.
    fn path_between(&self, from: TaskId, to: TaskId) -> Option<Vec<TaskId>> {
        let mut parents: BTreeMap<TaskId, TaskId> = BTreeMap::new();
        let mut visited = BTreeSet::from([from]);
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(parent) = parents.get(&cursor) {
                    path.push(*parent);
                    cursor = *parent;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.prerequisites_of(current) {
                if visited.insert(next) {
                    parents.insert(next, current);
                    stack.push(next);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: TaskId,
        marks: &mut BTreeMap<TaskId, Mark>,
        path: &mut Vec<TaskId>,
    ) -> Option<Vec<TaskId>> {
        marks.insert(node, Mark::InProgress);
        path.push(node);

        for next in self.prerequisites_of(node) {
            match marks.get(&next) {
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|id| *id == next).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(cycle) = self.visit(next, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }
}

fn remove_from(map: &mut BTreeMap<TaskId, BTreeSet<TaskId>>, key: TaskId, value: TaskId) {
    if let Some(set) = map.get_mut(&key) {
        set.remove(&value);
        if set.is_empty() {
            map.remove(&key);
        }
    }
}

fn format_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
