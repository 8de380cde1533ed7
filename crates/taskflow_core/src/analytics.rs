//! Productivity statistics over a task snapshot.
//!
//! # Invariants
//! - Pure function of `(tasks, now, window)`; no storage access.
//! - Day boundaries are UTC calendar days.

use crate::model::task::{Task, TaskPriority, TaskStatus};
use crate::query::filter::utc_day;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default length of the completion history window.
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub completed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub cancelled: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: u32,
    pub by_status: StatusCounts,
    /// Open tasks per priority, lowest priority first.
    pub open_by_priority: Vec<(TaskPriority, u32)>,
    pub overdue: u32,
    /// Completed share of non-cancelled tasks, in `0.0..=1.0`.
    pub completion_rate: f64,
    /// Oldest day first; the last entry is today.
    pub completions_per_day: Vec<DailyCount>,
    /// Consecutive days up to today (or yesterday) with a completion.
    pub current_streak_days: u32,
    /// Mean `completed_at - created_at`, when anything is completed.
    pub average_completion_ms: Option<i64>,
}

impl TaskStatistics {
    pub fn compute(tasks: &[Task], now_ms: i64) -> Self {
        Self::compute_with_window(tasks, now_ms, DEFAULT_HISTORY_DAYS)
    }

    pub fn compute_with_window(tasks: &[Task], now_ms: i64, history_days: u32) -> Self {
        let mut by_status = StatusCounts::default();
        let mut open_by_priority: BTreeMap<TaskPriority, u32> =
            TaskPriority::ALL.iter().map(|priority| (*priority, 0)).collect();
        let mut overdue = 0;
        let mut latency_total: i128 = 0;
        let mut latency_count: i128 = 0;
        let mut completion_days: BTreeMap<NaiveDate, u32> = BTreeMap::new();

        for task in tasks {
            match task.status {
                TaskStatus::Pending => by_status.pending += 1,
                TaskStatus::InProgress => by_status.in_progress += 1,
                TaskStatus::Completed => by_status.completed += 1,
                TaskStatus::Cancelled => by_status.cancelled += 1,
            }
            if task.status.is_open() {
                *open_by_priority.entry(task.priority).or_default() += 1;
            }
            if task.is_overdue(now_ms) {
                overdue += 1;
            }
            if let Some(completed_at) = task.completed_at {
                latency_total += i128::from(completed_at.saturating_sub(task.created_at).max(0));
                latency_count += 1;
                if let Some(day) = utc_day(completed_at) {
                    *completion_days.entry(day).or_default() += 1;
                }
            }
        }

        let considered = by_status.pending + by_status.in_progress + by_status.completed;
        let completion_rate = if considered == 0 {
            0.0
        } else {
            f64::from(by_status.completed) / f64::from(considered)
        };
        let today = utc_day(now_ms);

        Self {
            total: tasks.len() as u32,
            by_status,
            open_by_priority: open_by_priority.into_iter().collect(),
            overdue,
            completion_rate,
            completions_per_day: today
                .map(|today| history(&completion_days, today, history_days))
                .unwrap_or_default(),
            current_streak_days: today
                .map(|today| streak(&completion_days, today))
                .unwrap_or(0),
            average_completion_ms: (latency_count > 0)
                .then(|| (latency_total / latency_count) as i64),
        }
    }
}

fn history(completions: &BTreeMap<NaiveDate, u32>, today: NaiveDate, days: u32) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|day| DailyCount {
            day,
            completed: completions.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

/// A streak still counts when today has no completion yet.
fn streak(completions: &BTreeMap<NaiveDate, u32>, today: NaiveDate) -> u32 {
    let mut cursor = if completions.contains_key(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };
    let mut count = 0;
    while let Some(day) = cursor {
        if !completions.contains_key(&day) {
            break;
        }
        count += 1;
        cursor = day.pred_opt();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::TaskStatistics;
    use crate::model::task::{Task, TaskStatus};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn streak_tolerates_no_completion_today() {
        let now = 10 * DAY_MS + 1_000;
        let tasks: Vec<Task> = [9, 8, 6]
            .iter()
            .map(|day| {
                let mut task = Task::new("t", 0);
                task.mark_completed(day * DAY_MS);
                task
            })
            .collect();

        let stats = TaskStatistics::compute(&tasks, now);
        assert_eq!(stats.current_streak_days, 2);
        assert_eq!(stats.completions_per_day.len(), 7);
        assert_eq!(stats.completions_per_day[6].completed, 0);
        assert_eq!(stats.completions_per_day[5].completed, 1);
    }

    #[test]
    fn cancelled_tasks_do_not_affect_completion_rate() {
        let mut done = Task::new("done", 0);
        done.mark_completed(DAY_MS);
        let mut cancelled = Task::new("cancelled", 0);
        cancelled.status = TaskStatus::Cancelled;
        let open = Task::new("open", 0);

        let stats = TaskStatistics::compute(&[done, cancelled, open], 2 * DAY_MS);
        assert_eq!(stats.total, 3);
        assert!((stats.completion_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.average_completion_ms, Some(DAY_MS));
    }
}
