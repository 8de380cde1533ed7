//! Task filtering, sorting and grouping.
//!
//! # Responsibility
//! - Provide the list, Kanban and calendar projections the UI renders.
//!
//! # Invariants
//! - Sorting is stable; equal keys fall back to `created_at` then `id`.
//! - Tasks without a due date sort after dated ones in both directions.
//! - Day buckets use UTC calendar days.

use crate::model::category::CategoryId;
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskPriority, TaskStatus};
use crate::repo::tag_repo::normalize_tag;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Conjunctive task filter. Unset fields match every task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub project_id: Option<ProjectId>,
    pub category_id: Option<CategoryId>,
    pub tag: Option<String>,
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    /// Inclusive lower bound on `due_at`.
    pub due_from: Option<i64>,
    /// Exclusive upper bound on `due_at`.
    pub due_to: Option<i64>,
    pub overdue_only: bool,
    pub pinned_only: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now_ms: i64) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if self.project_id.is_some() && task.project_id != self.project_id {
            return false;
        }
        if self.category_id.is_some() && task.category_id != self.category_id {
            return false;
        }
        if let Some(tag) = self.tag.as_deref().and_then(normalize_tag) {
            if !task.tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(&tag)) {
                return false;
            }
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if self.due_from.is_some() || self.due_to.is_some() {
            let Some(due_at) = task.due_at else {
                return false;
            };
            if self.due_from.is_some_and(|from| due_at < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due_at >= to) {
                return false;
            }
        }
        if self.overdue_only && !task.is_overdue(now_ms) {
            return false;
        }
        if self.pinned_only && !task.is_pinned {
            return false;
        }
        true
    }

    /// Returns matching tasks in input order.
    pub fn apply(&self, tasks: &[Task], now_ms: i64) -> Vec<Task> {
        tasks
            .iter()
            .filter(|task| self.matches(task, now_ms))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DueDate,
    Priority,
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl TaskSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Total order used by [`sort_tasks`].
    pub fn compare(&self, left: &Task, right: &Task) -> Ordering {
        let primary = match self.key {
            // Undated tasks stay last whatever the direction.
            SortKey::DueDate => match (left.due_at, right.due_at) {
                (Some(a), Some(b)) => self.directed(a.cmp(&b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => self.directed(left.priority.cmp(&right.priority)),
            SortKey::CreatedAt => self.directed(left.created_at.cmp(&right.created_at)),
            SortKey::UpdatedAt => self.directed(left.updated_at.cmp(&right.updated_at)),
            SortKey::Title => self.directed(
                left.title
                    .to_lowercase()
                    .cmp(&right.title.to_lowercase()),
            ),
            SortKey::Status => self.directed(status_rank(left.status).cmp(&status_rank(right.status))),
        };
        primary
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Sorts in place with [`TaskSort::compare`].
pub fn sort_tasks(tasks: &mut [Task], sort: TaskSort) {
    tasks.sort_by(|left, right| sort.compare(left, right));
}

fn status_rank(status: TaskStatus) -> usize {
    TaskStatus::ALL
        .iter()
        .position(|candidate| *candidate == status)
        .unwrap_or(TaskStatus::ALL.len())
}

/// One Kanban column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Groups tasks into one column per status, in lifecycle order.
///
/// Every status gets a column, even when empty. Tasks keep input order.
pub fn group_by_status(tasks: &[Task]) -> Vec<StatusColumn> {
    TaskStatus::ALL
        .iter()
        .map(|status| StatusColumn {
            status: *status,
            tasks: tasks
                .iter()
                .filter(|task| task.status == *status)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Calendar buckets keyed by UTC day, plus undated tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueDayGroups {
    pub days: BTreeMap<NaiveDate, Vec<Task>>,
    pub undated: Vec<Task>,
}

pub fn group_by_due_day(tasks: &[Task]) -> DueDayGroups {
    let mut groups = DueDayGroups::default();
    for task in tasks {
        match task.due_at.and_then(utc_day) {
            Some(day) => groups.days.entry(day).or_default().push(task.clone()),
            None => groups.undated.push(task.clone()),
        }
    }
    groups
}

/// UTC calendar day containing `epoch_ms`.
pub fn utc_day(epoch_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(epoch_ms).map(|value| value.date_naive())
}

#[cfg(test)]
mod tests {
    use super::{
        group_by_due_day, group_by_status, sort_tasks, SortDirection, SortKey, TaskFilter,
        TaskSort,
    };
    use crate::model::task::{Task, TaskPriority, TaskStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn task(title: &str, created_at: i64, due_at: Option<i64>) -> Task {
        let mut task = Task::new(title, created_at);
        task.due_at = due_at;
        task
    }

    #[test]
    fn due_date_sort_keeps_undated_last_when_descending() {
        let mut tasks = vec![
            task("undated", 1, None),
            task("early", 2, Some(10)),
            task("late", 3, Some(20)),
        ];
        sort_tasks(
            &mut tasks,
            TaskSort::new(SortKey::DueDate, SortDirection::Descending),
        );
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["late", "early", "undated"]);
    }

    #[test]
    fn equal_keys_fall_back_to_creation_time() {
        let mut first = task("a", 1, None);
        first.priority = TaskPriority::High;
        let mut second = task("b", 2, None);
        second.priority = TaskPriority::High;
        let mut tasks = vec![second.clone(), first.clone()];
        sort_tasks(&mut tasks, TaskSort::new(SortKey::Priority, SortDirection::Descending));
        assert_eq!(tasks[0].id, first.id);
    }

    #[test]
    fn due_range_excludes_undated_tasks() {
        let filter = TaskFilter {
            due_from: Some(0),
            due_to: Some(100),
            ..TaskFilter::default()
        };
        assert!(filter.matches(&task("in", 0, Some(99)), 0));
        assert!(!filter.matches(&task("edge", 0, Some(100)), 0));
        assert!(!filter.matches(&task("none", 0, None), 0));
    }

    #[test]
    fn kanban_has_every_column_in_lifecycle_order() {
        let mut doing = task("doing", 1, None);
        doing.status = TaskStatus::InProgress;
        let tasks = vec![task("first", 1, None), doing.clone(), task("second", 2, None)];

        let columns = group_by_status(&tasks);
        let statuses: Vec<_> = columns.iter().map(|column| column.status).collect();
        assert_eq!(statuses, TaskStatus::ALL.to_vec());

        let pending = &columns[0].tasks;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].title, "first");
        assert_eq!(pending[1].title, "second");
        let in_progress = columns
            .iter()
            .find(|column| column.status == TaskStatus::InProgress)
            .unwrap();
        assert_eq!(in_progress.tasks, vec![doing]);
        assert!(columns
            .iter()
            .filter(|column| !column.status.is_open())
            .all(|column| column.tasks.is_empty()));
    }

    #[test]
    fn due_day_buckets_split_at_utc_midnight() {
        let late = Utc
            .with_ymd_and_hms(2026, 3, 4, 23, 59, 0)
            .unwrap()
            .timestamp_millis();
        let midnight = Utc
            .with_ymd_and_hms(2026, 3, 5, 0, 0, 0)
            .unwrap()
            .timestamp_millis();
        let tasks = vec![
            task("late", 1, Some(late)),
            task("undated", 2, None),
            task("midnight", 3, Some(midnight)),
        ];

        let groups = group_by_due_day(&tasks);
        let march_4 = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let march_5 = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(groups.days.len(), 2);
        assert_eq!(groups.days[&march_4][0].title, "late");
        assert_eq!(groups.days[&march_5][0].title, "midnight");
        assert_eq!(groups.undated.len(), 1);
        assert_eq!(groups.undated[0].title, "undated");
    }
}
