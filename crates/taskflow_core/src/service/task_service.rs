//! Task use-case service.
//!
//! # Responsibility
//! - Provide create/update/list/delete entry points for tasks.
//! - Drive the status lifecycle, including completion of recurring tasks.
//!
//! # Invariants
//! - Status only changes through [`TaskService::set_status`] and its wrappers,
//!   never through `update_task`.
//! - A task cannot be completed while any prerequisite is not completed.
//! - Completing one occurrence stores at most one successor, even when the
//!   occurrence is reopened and completed again.

use crate::clock::{now_epoch_ms, Clock};
use crate::model::category::CategoryId;
use crate::model::project::ProjectId;
use crate::model::recurrence::RecurrencePattern;
use crate::model::task::{
    Subtask, SubtaskId, Task, TaskId, TaskPriority, TaskStatus, TaskValidationError,
};
use crate::repo::tag_repo::normalize_tags;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::recurrence::build_successor;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    InvalidTask(TaskValidationError),
    TaskNotFound(TaskId),
    SubtaskNotFound(SubtaskId),
    /// A listed prerequisite does not exist.
    PrerequisiteNotFound(TaskId),
    InvalidTransition {
        from: TaskStatus,
        to: TaskStatus,
    },
    /// Completion refused; `pending` lists unfinished prerequisites.
    DependenciesIncomplete {
        task_id: TaskId,
        pending: Vec<TaskId>,
    },
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTask(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound(id) => write!(f, "subtask not found: {id}"),
            Self::PrerequisiteNotFound(id) => write!(f, "prerequisite task not found: {id}"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "cannot move task from `{}` to `{}`",
                from.as_str(),
                to.as_str()
            ),
            Self::DependenciesIncomplete { task_id, pending } => write!(
                f,
                "task {task_id} is blocked by {} unfinished prerequisite(s)",
                pending.len()
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTask(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "task",
                id,
            } => Self::TaskNotFound(id),
            RepoError::InvalidTask(err) => Self::InvalidTask(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidTask(value)
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Request model for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_at: Option<i64>,
    pub project_id: Option<ProjectId>,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    /// Checklist item titles, in order.
    pub subtasks: Vec<String>,
    pub recurrence: Option<RecurrencePattern>,
    pub dependencies: Vec<TaskId>,
    pub estimated_minutes: Option<u32>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Result of completing (or toggling) a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// The task after the status change.
    pub task: Task,
    /// Next occurrence stored for a completed recurring task.
    pub successor: Option<Task>,
}

/// Task service facade over repository implementations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    clock: Clock,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    /// Creates a service reading "now" from `clock`.
    pub fn with_clock(repo: R, clock: Clock) -> Self {
        Self { repo, clock }
    }

    pub fn create_task(&self, request: NewTask) -> TaskServiceResult<Task> {
        let now = (self.clock)();
        let mut task = Task::new(request.title.trim().to_string(), now);
        task.description = normalize_description(request.description);
        task.priority = request.priority;
        task.due_at = request.due_at;
        task.project_id = request.project_id;
        task.category_id = request.category_id;
        task.tags = normalize_tags(&request.tags);
        task.subtasks = request
            .subtasks
            .into_iter()
            .enumerate()
            .map(|(position, title)| Subtask::new(title.trim().to_string(), position as u32))
            .collect();
        task.recurrence = request.recurrence;
        task.estimated_minutes = request.estimated_minutes;
        task.dependencies = sorted_unique(request.dependencies);

        self.ensure_prerequisites_exist(&task.dependencies)?;
        self.repo.create_task(&task)?;
        info!(
            "event=task_create module=service status=ok task_id={} recurring={} dependencies={}",
            task.id,
            task.is_recurring(),
            task.dependencies.len()
        );
        Ok(task)
    }

    /// Stores an already-built task, e.g. one stamped from a template.
    pub fn insert_task(&self, mut task: Task) -> TaskServiceResult<Task> {
        task.tags = normalize_tags(&task.tags);
        task.dependencies = sorted_unique(task.dependencies);
        self.ensure_prerequisites_exist(&task.dependencies)?;
        self.repo.create_task(&task)?;
        Ok(task)
    }

    /// Replaces editable task content.
    ///
    /// Status, completion time, dependencies and series links are kept from
    /// the stored record; use the dedicated operations to change them.
    pub fn update_task(&self, task: Task) -> TaskServiceResult<Task> {
        let stored = self.require_task(task.id)?;
        let mut updated = task;
        updated.title = updated.title.trim().to_string();
        updated.description = normalize_description(updated.description);
        updated.tags = normalize_tags(&updated.tags);
        updated.status = stored.status;
        updated.completed_at = stored.completed_at;
        updated.dependencies = stored.dependencies;
        updated.recurrence_parent_id = stored.recurrence_parent_id;
        updated.recurrence_source_id = stored.recurrence_source_id;
        updated.occurrence_index = stored.occurrence_index;
        updated.created_at = stored.created_at;
        updated.updated_at = (self.clock)();

        self.repo.update_task(&updated)?;
        Ok(updated)
    }

    pub fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.repo.get_task(id)
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks(query)
    }

    pub fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        self.repo.delete_task(id)?;
        info!("event=task_delete module=service status=ok task_id={id}");
        Ok(())
    }

    /// Moves a task to `status`, enforcing lifecycle and dependency rules.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> TaskServiceResult<CompletionOutcome> {
        if status == TaskStatus::Completed {
            return self.complete_task(id);
        }

        let mut task = self.require_task(id)?;
        if task.status == status {
            return Ok(CompletionOutcome {
                task,
                successor: None,
            });
        }
        if !task.status.can_transition_to(status) {
            return Err(TaskServiceError::InvalidTransition {
                from: task.status,
                to: status,
            });
        }

        let now = (self.clock)();
        match status {
            TaskStatus::Pending => task.reopen(now),
            other => {
                task.status = other;
                task.completed_at = None;
                task.updated_at = now;
            }
        }
        self.repo.update_task(&task)?;
        Ok(CompletionOutcome {
            task,
            successor: None,
        })
    }

    /// Completes a task and stores the next occurrence when it recurs.
    ///
    /// Completing an already completed task is a no-op that reports the
    /// successor stored earlier.
    pub fn complete_task(&self, id: TaskId) -> TaskServiceResult<CompletionOutcome> {
        let mut task = self.require_task(id)?;
        if task.status == TaskStatus::Completed {
            let successor = self.repo.find_successor(id)?;
            return Ok(CompletionOutcome { task, successor });
        }
        if !task.status.can_transition_to(TaskStatus::Completed) {
            return Err(TaskServiceError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Completed,
            });
        }

        let pending = self.unfinished_prerequisites(&task)?;
        if !pending.is_empty() {
            warn!(
                "event=task_complete module=service status=error task_id={} error_code=dependencies_incomplete pending={}",
                id,
                pending.len()
            );
            return Err(TaskServiceError::DependenciesIncomplete {
                task_id: id,
                pending,
            });
        }

        let now = (self.clock)();
        task.mark_completed(now);
        let candidate = build_successor(&task, now);
        let successor = self.repo.save_completion(&task, candidate.as_ref())?;
        info!(
            "event=task_complete module=service status=ok task_id={} successor_id={}",
            id,
            successor
                .as_ref()
                .map_or_else(|| "none".to_string(), |next| next.id.to_string())
        );
        Ok(CompletionOutcome { task, successor })
    }

    /// Flips completion: open tasks are completed, completed tasks reopened.
    ///
    /// Reopening keeps any successor generated earlier.
    pub fn toggle_completion(&self, id: TaskId) -> TaskServiceResult<CompletionOutcome> {
        let task = self.require_task(id)?;
        match task.status {
            TaskStatus::Completed => self.set_status(id, TaskStatus::Pending),
            _ => self.complete_task(id),
        }
    }

    pub fn toggle_subtask(&self, task_id: TaskId, subtask_id: SubtaskId) -> TaskServiceResult<Task> {
        let mut task = self.require_task(task_id)?;
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
            .ok_or(TaskServiceError::SubtaskNotFound(subtask_id))?;
        subtask.is_completed = !subtask.is_completed;
        task.updated_at = (self.clock)();
        self.repo.update_task(&task)?;
        Ok(task)
    }

    /// Replaces the full tag set of one task.
    pub fn set_tags(&self, task_id: TaskId, tags: &[String]) -> TaskServiceResult<Task> {
        let mut task = self.require_task(task_id)?;
        task.tags = normalize_tags(tags);
        task.updated_at = (self.clock)();
        self.repo.update_task(&task)?;
        Ok(task)
    }

    /// Prerequisites of `task` that are not completed yet.
    pub fn unfinished_prerequisites(&self, task: &Task) -> TaskServiceResult<Vec<TaskId>> {
        let statuses = self.repo.task_statuses(&task.dependencies)?;
        Ok(task
            .dependencies
            .iter()
            .filter(|id| {
                statuses
                    .get(id)
                    .is_some_and(|status| *status != TaskStatus::Completed)
            })
            .copied()
            .collect())
    }

    fn require_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    fn ensure_prerequisites_exist(&self, dependencies: &[TaskId]) -> TaskServiceResult<()> {
        let statuses = self.repo.task_statuses(dependencies)?;
        match dependencies.iter().find(|id| !statuses.contains_key(id)) {
            Some(missing) => Err(TaskServiceError::PrerequisiteNotFound(*missing)),
            None => Ok(()),
        }
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn sorted_unique(mut ids: Vec<TaskId>) -> Vec<TaskId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
