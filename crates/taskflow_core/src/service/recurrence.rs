//! Successor construction for recurring tasks.
//!
//! # Invariants
//! - One completed occurrence yields at most one successor.
//! - The successor's due time comes from [`RecurrencePattern::next_occurrence`]
//!   anchored at the completed task's due time (or completion time when undated).
//! - Dependencies are not carried over; they referred to the finished occurrence.

use crate::model::recurrence::RecurrencePattern;
use crate::model::task::{Subtask, Task, TaskStatus};
use uuid::Uuid;

/// Computes the due time of the occurrence following `task`.
pub fn next_due_at(task: &Task, completed_at: i64) -> Option<i64> {
    let pattern: &RecurrencePattern = task.recurrence.as_ref()?;
    let anchor = task.due_at.unwrap_or(completed_at);
    pattern.next_occurrence(anchor, task.occurrence_index)
}

/// Builds the next occurrence of a recurring `task` completed at `completed_at`.
///
/// Returns `None` when the task does not recur or its series has ended.
pub fn build_successor(task: &Task, completed_at: i64) -> Option<Task> {
    let due_at = next_due_at(task, completed_at)?;

    let mut successor = Task::new(task.title.clone(), completed_at);
    successor.description = task.description.clone();
    successor.status = TaskStatus::Pending;
    successor.priority = task.priority;
    successor.due_at = Some(due_at);
    successor.project_id = task.project_id;
    successor.category_id = task.category_id;
    successor.recurrence_parent_id = Some(task.series_root());
    successor.recurrence_source_id = Some(task.id);
    successor.occurrence_index = task.occurrence_index.saturating_add(1);
    successor.recurrence = task.recurrence.clone();
    successor.tags = task.tags.clone();
    successor.subtasks = task
        .subtasks
        .iter()
        .map(|subtask| Subtask {
            id: Uuid::new_v4(),
            title: subtask.title.clone(),
            is_completed: false,
            position: subtask.position,
        })
        .collect();
    successor.estimated_minutes = task.estimated_minutes;
    successor.is_pinned = task.is_pinned;
    Some(successor)
}

#[cfg(test)]
mod tests {
    use super::build_successor;
    use crate::model::recurrence::{RecurrenceEnd, RecurrencePattern};
    use crate::model::task::{Subtask, Task};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn successor_resets_checklist_and_links_series() {
        let mut task = Task::new("water plants", 0);
        task.due_at = Some(10 * DAY_MS);
        task.recurrence = Some(RecurrencePattern::daily().every(3));
        let mut subtask = Subtask::new("balcony", 0);
        subtask.is_completed = true;
        task.subtasks.push(subtask.clone());
        task.dependencies.push(uuid::Uuid::new_v4());

        let successor = build_successor(&task, 11 * DAY_MS).expect("successor");
        assert_eq!(successor.due_at, Some(13 * DAY_MS));
        assert_eq!(successor.recurrence_parent_id, Some(task.id));
        assert_eq!(successor.recurrence_source_id, Some(task.id));
        assert_eq!(successor.occurrence_index, 2);
        assert!(successor.dependencies.is_empty());
        assert!(!successor.subtasks[0].is_completed);
        assert_ne!(successor.subtasks[0].id, subtask.id);
    }

    #[test]
    fn finished_series_yields_no_successor() {
        let mut task = Task::new("standup", 0);
        task.due_at = Some(DAY_MS);
        task.occurrence_index = 3;
        task.recurrence =
            Some(RecurrencePattern::daily().ending(RecurrenceEnd::AfterOccurrences(3)));

        assert!(build_successor(&task, DAY_MS).is_none());
    }

    #[test]
    fn undated_task_anchors_on_completion_time() {
        let mut task = Task::new("review inbox", 0);
        task.recurrence = Some(RecurrencePattern::weekly());

        let successor = build_successor(&task, 2 * DAY_MS).expect("successor");
        assert_eq!(successor.due_at, Some(9 * DAY_MS));
    }
}
