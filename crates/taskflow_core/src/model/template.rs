//! Task template domain model.
//!
//! A template captures the reusable shape of a task (title, checklist, tags,
//! repeat rule) so new tasks can be stamped out from it.

use crate::model::recurrence::RecurrencePattern;
use crate::model::task::{Subtask, Task, TaskPriority};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TemplateId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: TemplateId,
    /// Label shown in the template gallery.
    pub name: String,
    /// Title given to tasks created from this template.
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
    /// Checklist item titles, in order.
    pub subtasks: Vec<String>,
    pub recurrence: Option<RecurrencePattern>,
    pub estimated_minutes: Option<u32>,
    pub usage_count: u32,
    pub created_at: i64,
}

impl TaskTemplate {
    pub fn new(name: impl Into<String>, title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            tags: Vec::new(),
            subtasks: Vec::new(),
            recurrence: None,
            estimated_minutes: None,
            usage_count: 0,
            created_at: now_ms,
        }
    }

    /// Builds a fresh pending task from this template.
    pub fn instantiate(&self, now_ms: i64, due_at: Option<i64>) -> Task {
        let mut task = Task::new(self.title.clone(), now_ms);
        task.description = self.description.clone();
        task.priority = self.priority;
        task.tags = self.tags.clone();
        task.subtasks = self
            .subtasks
            .iter()
            .enumerate()
            .map(|(position, title)| Subtask::new(title.clone(), position as u32))
            .collect();
        task.recurrence = self.recurrence.clone();
        task.estimated_minutes = self.estimated_minutes;
        task.due_at = due_at;
        task
    }
}
