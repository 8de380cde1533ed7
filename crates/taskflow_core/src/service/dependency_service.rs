//! Dependency use-case service.
//!
//! # Responsibility
//! - Validate prerequisite edits against the persisted dependency graph.
//! - Classify tasks as ready or blocked.
//!
//! # Invariants
//! - Persisted edges never form a cycle and never point at the task itself.
//! - Only `Completed` prerequisites count as resolved; cancelled ones still
//!   block until the edge is removed.

use crate::graph::{DependencyGraph, GraphError};
use crate::model::task::{Task, TaskId, TaskStatus};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::service::task_service::sorted_unique;
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum DependencyError {
    TaskNotFound(TaskId),
    PrerequisiteNotFound(TaskId),
    SelfDependency(TaskId),
    CycleDetected { path: Vec<TaskId> },
    Repo(RepoError),
}

impl Display for DependencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::PrerequisiteNotFound(id) => write!(f, "prerequisite task not found: {id}"),
            Self::SelfDependency(id) => write!(f, "task {id} cannot depend on itself"),
            Self::CycleDetected { path } => {
                write!(f, "{}", GraphError::CycleDetected { path: path.clone() })
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DependencyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DependencyError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "task",
                id,
            } => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<GraphError> for DependencyError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::SelfDependency(id) => Self::SelfDependency(id),
            GraphError::CycleDetected { path } => Self::CycleDetected { path },
        }
    }
}

pub type DependencyResult<T> = Result<T, DependencyError>;

/// A task that cannot start yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    pub task_id: TaskId,
    /// Unresolved prerequisites, sorted by ID.
    pub waiting_on: Vec<TaskId>,
}

/// Split of open tasks into ready and blocked sets, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readiness {
    pub ready: Vec<TaskId>,
    pub blocked: Vec<BlockedTask>,
}

impl Readiness {
    pub fn is_blocked(&self, id: TaskId) -> bool {
        self.blocked.iter().any(|entry| entry.task_id == id)
    }
}

/// Classifies open tasks using `statuses` for prerequisite lookups.
///
/// Closed tasks (completed or cancelled) are skipped. A prerequisite missing
/// from `statuses` is treated as resolved, since its row no longer exists.
pub fn classify(tasks: &[Task], statuses: &HashMap<TaskId, TaskStatus>) -> Readiness {
    let mut readiness = Readiness::default();
    for task in tasks.iter().filter(|task| task.status.is_open()) {
        let waiting_on = unresolved(&task.dependencies, statuses);
        if waiting_on.is_empty() {
            readiness.ready.push(task.id);
        } else {
            readiness.blocked.push(BlockedTask {
                task_id: task.id,
                waiting_on,
            });
        }
    }
    readiness
}

fn unresolved(dependencies: &[TaskId], statuses: &HashMap<TaskId, TaskStatus>) -> Vec<TaskId> {
    let mut waiting_on: Vec<TaskId> = dependencies
        .iter()
        .filter(|id| {
            statuses
                .get(id)
                .is_some_and(|status| *status != TaskStatus::Completed)
        })
        .copied()
        .collect();
    waiting_on.sort_unstable();
    waiting_on
}

pub struct DependencyService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> DependencyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads the persisted graph.
    pub fn graph(&self) -> DependencyResult<DependencyGraph> {
        Ok(DependencyGraph::from_edges(self.repo.dependency_edges()?))
    }

    /// Makes `task_id` wait for `prerequisite_id`.
    pub fn add_dependency(&self, task_id: TaskId, prerequisite_id: TaskId) -> DependencyResult<()> {
        if task_id == prerequisite_id {
            return Err(DependencyError::SelfDependency(task_id));
        }
        let task = self.require_task(task_id)?;
        self.require_prerequisites(&[prerequisite_id])?;
        if task.dependencies.contains(&prerequisite_id) {
            return Ok(());
        }

        let mut graph = self.graph()?;
        if let Err(err) = graph.add_edge(task_id, prerequisite_id) {
            warn!(
                "event=dependency_add module=service status=error task_id={task_id} prerequisite_id={prerequisite_id} error={err}"
            );
            return Err(err.into());
        }

        let mut dependencies = task.dependencies;
        dependencies.push(prerequisite_id);
        self.repo
            .set_dependencies(task_id, &sorted_unique(dependencies))?;
        info!(
            "event=dependency_add module=service status=ok task_id={task_id} prerequisite_id={prerequisite_id}"
        );
        Ok(())
    }

    /// Removes one edge; removing an absent edge is a no-op.
    pub fn remove_dependency(
        &self,
        task_id: TaskId,
        prerequisite_id: TaskId,
    ) -> DependencyResult<()> {
        let task = self.require_task(task_id)?;
        if !task.dependencies.contains(&prerequisite_id) {
            return Ok(());
        }
        let remaining: Vec<TaskId> = task
            .dependencies
            .into_iter()
            .filter(|id| *id != prerequisite_id)
            .collect();
        self.repo.set_dependencies(task_id, &remaining)?;
        info!(
            "event=dependency_remove module=service status=ok task_id={task_id} prerequisite_id={prerequisite_id}"
        );
        Ok(())
    }

    /// Replaces the whole prerequisite set, validating it as a unit.
    pub fn set_dependencies(
        &self,
        task_id: TaskId,
        dependencies: Vec<TaskId>,
    ) -> DependencyResult<Vec<TaskId>> {
        let dependencies = sorted_unique(dependencies);
        if dependencies.contains(&task_id) {
            return Err(DependencyError::SelfDependency(task_id));
        }
        self.require_task(task_id)?;
        self.require_prerequisites(&dependencies)?;

        let mut graph = self.graph()?;
        for prerequisite in graph.prerequisites_of(task_id) {
            graph.remove_edge(task_id, prerequisite);
        }
        for prerequisite in &dependencies {
            graph.add_edge(task_id, *prerequisite)?;
        }

        self.repo.set_dependencies(task_id, &dependencies)?;
        Ok(dependencies)
    }

    /// Unresolved prerequisites of one task.
    pub fn blocking_prerequisites(&self, task_id: TaskId) -> DependencyResult<Vec<TaskId>> {
        let task = self.require_task(task_id)?;
        let statuses = self.repo.task_statuses(&task.dependencies)?;
        Ok(unresolved(&task.dependencies, &statuses))
    }

    /// Classifies `tasks` against the stored status of their prerequisites.
    pub fn readiness(&self, tasks: &[Task]) -> DependencyResult<Readiness> {
        let ids = sorted_unique(
            tasks
                .iter()
                .flat_map(|task| task.dependencies.iter().copied())
                .collect(),
        );
        let statuses = self.repo.task_statuses(&ids)?;
        Ok(classify(tasks, &statuses))
    }

    fn require_task(&self, id: TaskId) -> DependencyResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(DependencyError::TaskNotFound(id))
    }

    fn require_prerequisites(&self, ids: &[TaskId]) -> DependencyResult<()> {
        let statuses = self.repo.task_statuses(ids)?;
        match ids.iter().find(|id| !statuses.contains_key(id)) {
            Some(missing) => Err(DependencyError::PrerequisiteNotFound(*missing)),
            None => Ok(()),
        }
    }
}
