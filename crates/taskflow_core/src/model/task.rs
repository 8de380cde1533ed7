//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record rendered by list, board and calendar views.
//! - Own status lifecycle rules and completion bookkeeping.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - A task never lists itself (or the same prerequisite twice) in `dependencies`.
//! - `completed_at` is set if and only if `status == Completed`.
//! - Status changes follow [`TaskStatus::can_transition_to`].

use crate::model::category::CategoryId;
use crate::model::project::ProjectId;
use crate::model::recurrence::{RecurrencePattern, RecurrenceValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for tasks.
pub type TaskId = Uuid;

/// Stable identifier for subtasks.
pub type SubtaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Pending,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Completed,
    /// No longer actionable.
    Cancelled,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    /// Returns whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Completed and cancelled tasks can only go back to pending (reopen).
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (InProgress, Pending)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (Completed, Pending)
                | (Cancelled, Pending)
        )
    }

    /// Returns whether the task still needs work.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// Storage / wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a storage / wire label.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

/// Task urgency. Ordering follows urgency (`Low < Urgent`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    /// Numeric weight used for sorting and analytics.
    pub fn weight(self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
            TaskPriority::Urgent => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

/// Checklist item owned by one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    pub is_completed: bool,
    /// Display order inside the parent task.
    pub position: u32,
}

impl Subtask {
    pub fn new(title: impl Into<String>, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
            position,
        }
    }
}

/// Validation failures for task records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
    BlankTitle,
    BlankSubtaskTitle(SubtaskId),
    SelfDependency(TaskId),
    DuplicateDependency(TaskId),
    /// `status == Completed` without `completed_at`, or the reverse.
    CompletionMismatch {
        status: TaskStatus,
        completed_at: Option<i64>,
    },
    ZeroOccurrenceIndex,
    Recurrence(RecurrenceValidationError),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::BlankSubtaskTitle(id) => write!(f, "subtask {id} title must not be blank"),
            Self::SelfDependency(id) => write!(f, "task {id} cannot depend on itself"),
            Self::DuplicateDependency(id) => {
                write!(f, "dependency {id} is listed more than once")
            }
            Self::CompletionMismatch {
                status,
                completed_at,
            } => write!(
                f,
                "completed_at ({completed_at:?}) is inconsistent with status `{}`",
                status.as_str()
            ),
            Self::ZeroOccurrenceIndex => write!(f, "occurrence_index must be >= 1"),
            Self::Recurrence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Recurrence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecurrenceValidationError> for TaskValidationError {
    fn from(value: RecurrenceValidationError) -> Self {
        Self::Recurrence(value)
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Unix epoch milliseconds.
    pub due_at: Option<i64>,
    /// Unix epoch milliseconds. Present only for completed tasks.
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub project_id: Option<ProjectId>,
    pub category_id: Option<CategoryId>,
    /// First task of the recurring series this task belongs to.
    pub recurrence_parent_id: Option<TaskId>,
    /// Occurrence whose completion generated this task.
    pub recurrence_source_id: Option<TaskId>,
    /// 1-based position inside the recurring series.
    pub occurrence_index: u32,
    pub recurrence: Option<RecurrencePattern>,
    /// Normalized lowercase tag names.
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    /// Prerequisite task IDs.
    pub dependencies: Vec<TaskId>,
    pub estimated_minutes: Option<u32>,
    pub is_pinned: bool,
}

impl Task {
    /// Creates a pending task with a generated ID.
    pub fn new(title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::default(),
            due_at: None,
            completed_at: None,
            created_at: now_ms,
            updated_at: now_ms,
            project_id: None,
            category_id: None,
            recurrence_parent_id: None,
            recurrence_source_id: None,
            occurrence_index: 1,
            recurrence: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
            dependencies: Vec::new(),
            estimated_minutes: None,
            is_pinned: false,
        }
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if let Some(subtask) = self.subtasks.iter().find(|s| s.title.trim().is_empty()) {
            return Err(TaskValidationError::BlankSubtaskTitle(subtask.id));
        }

        let mut seen = HashSet::new();
        for dependency in &self.dependencies {
            if *dependency == self.id {
                return Err(TaskValidationError::SelfDependency(self.id));
            }
            if !seen.insert(*dependency) {
                return Err(TaskValidationError::DuplicateDependency(*dependency));
            }
        }

        let completed = self.status == TaskStatus::Completed;
        if completed != self.completed_at.is_some() {
            return Err(TaskValidationError::CompletionMismatch {
                status: self.status,
                completed_at: self.completed_at,
            });
        }

        if self.occurrence_index == 0 {
            return Err(TaskValidationError::ZeroOccurrenceIndex);
        }
        if let Some(pattern) = &self.recurrence {
            pattern.validate()?;
        }
        Ok(())
    }

    /// Open task whose due time is strictly in the past.
    pub fn is_overdue(&self, now_ms: i64) -> bool {
        self.status.is_open() && self.due_at.is_some_and(|due| due < now_ms)
    }

    /// Returns `(completed, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.is_completed).count();
        (done, self.subtasks.len())
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Root of the recurring series (itself for the first occurrence).
    pub fn series_root(&self) -> TaskId {
        self.recurrence_parent_id.unwrap_or(self.id)
    }

    pub fn mark_completed(&mut self, now_ms: i64) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now_ms);
        self.updated_at = now_ms;
    }

    pub fn reopen(&mut self, now_ms: i64) {
        self.status = TaskStatus::Pending;
        self.completed_at = None;
        self.updated_at = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskPriority, TaskStatus, TaskValidationError};

    #[test]
    fn transitions_follow_lifecycle() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn priority_order_matches_weight() {
        assert!(TaskPriority::Urgent > TaskPriority::High);
        assert!(TaskPriority::Low.weight() < TaskPriority::Medium.weight());
    }

    #[test]
    fn validate_rejects_completion_mismatch() {
        let mut task = Task::new("ship", 10);
        task.status = TaskStatus::Completed;
        assert!(matches!(
            task.validate(),
            Err(TaskValidationError::CompletionMismatch { .. })
        ));
    }
}
