//! Recurrence rules and next-occurrence arithmetic.
//!
//! # Responsibility
//! - Describe how a recurring task repeats (frequency, interval, day sets, end).
//! - Compute the next due time from an anchor, deterministically.
//!
//! # Invariants
//! - `interval >= 1`.
//! - Weekdays use ISO numbering (`1 = Monday .. 7 = Sunday`).
//! - Calendar arithmetic runs in UTC and keeps the anchor's time of day.
//! - `next_occurrence` is strictly later than its anchor.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
/// Upper bound on month cycles scanned when looking for a listed day-of-month.
const MAX_MONTH_CYCLES: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// When a recurring series stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecurrenceEnd {
    #[default]
    Never,
    /// No occurrence may be due after this epoch-ms bound.
    Until(i64),
    /// Total number of occurrences in the series, the first included.
    AfterOccurrences(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceValidationError {
    ZeroInterval,
    InvalidWeekday(u8),
    InvalidDayOfMonth(u8),
    /// Day set given for a frequency that does not use it.
    UnusedDaySet(RecurrenceFrequency),
    ZeroOccurrences,
}

impl Display for RecurrenceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "recurrence interval must be >= 1"),
            Self::InvalidWeekday(day) => write!(f, "weekday {day} is outside 1..=7"),
            Self::InvalidDayOfMonth(day) => write!(f, "day of month {day} is outside 1..=31"),
            Self::UnusedDaySet(frequency) => {
                write!(f, "day set is not supported for {frequency:?} recurrence")
            }
            Self::ZeroOccurrences => write!(f, "occurrence limit must be >= 1"),
        }
    }
}

impl Error for RecurrenceValidationError {}

/// Repeat rule attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: RecurrenceFrequency,
    pub interval: u32,
    /// ISO weekdays, used by weekly rules. Empty means "same weekday".
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// Days of month, used by monthly rules. Empty means "same day".
    #[serde(default)]
    pub days_of_month: Vec<u8>,
    #[serde(default)]
    pub end: RecurrenceEnd,
}

impl RecurrencePattern {
    pub fn new(frequency: RecurrenceFrequency) -> Self {
        Self {
            frequency,
            interval: 1,
            days_of_week: Vec::new(),
            days_of_month: Vec::new(),
            end: RecurrenceEnd::Never,
        }
    }

    pub fn daily() -> Self {
        Self::new(RecurrenceFrequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(RecurrenceFrequency::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(RecurrenceFrequency::Monthly)
    }

    pub fn yearly() -> Self {
        Self::new(RecurrenceFrequency::Yearly)
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Sets ISO weekdays; input is sorted and deduplicated.
    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = sorted_unique(days);
        self
    }

    /// Sets days of month; input is sorted and deduplicated.
    pub fn on_days_of_month(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_month = sorted_unique(days);
        self
    }

    pub fn ending(mut self, end: RecurrenceEnd) -> Self {
        self.end = end;
        self
    }

    pub fn validate(&self) -> Result<(), RecurrenceValidationError> {
        if self.interval == 0 {
            return Err(RecurrenceValidationError::ZeroInterval);
        }
        if let Some(day) = self.days_of_week.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(RecurrenceValidationError::InvalidWeekday(*day));
        }
        if let Some(day) = self.days_of_month.iter().find(|d| !(1..=31).contains(*d)) {
            return Err(RecurrenceValidationError::InvalidDayOfMonth(*day));
        }
        if !self.days_of_week.is_empty() && self.frequency != RecurrenceFrequency::Weekly {
            return Err(RecurrenceValidationError::UnusedDaySet(self.frequency));
        }
        if !self.days_of_month.is_empty() && self.frequency != RecurrenceFrequency::Monthly {
            return Err(RecurrenceValidationError::UnusedDaySet(self.frequency));
        }
        if self.end == RecurrenceEnd::AfterOccurrences(0) {
            return Err(RecurrenceValidationError::ZeroOccurrences);
        }
        Ok(())
    }

    /// Computes the due time following `anchor_ms`.
    ///
    /// `occurrence_index` is the 1-based position of the anchor occurrence in
    /// its series. Returns `None` when the series has ended or the date falls
    /// outside chrono's representable range.
    pub fn next_occurrence(&self, anchor_ms: i64, occurrence_index: u32) -> Option<i64> {
        if let RecurrenceEnd::AfterOccurrences(max) = self.end {
            if occurrence_index >= max {
                return None;
            }
        }

        let anchor = DateTime::<Utc>::from_timestamp_millis(anchor_ms)?;
        let interval = self.interval.max(1);
        let next = match self.frequency {
            RecurrenceFrequency::Daily => anchor.checked_add_days(Days::new(u64::from(interval))),
            RecurrenceFrequency::Weekly => self.next_weekly(anchor, interval),
            RecurrenceFrequency::Monthly => self.next_monthly(anchor, interval),
            RecurrenceFrequency::Yearly => shift_months_clamped(anchor, 12 * interval),
        }?;

        let next_ms = next.timestamp_millis();
        if let RecurrenceEnd::Until(until) = self.end {
            if next_ms > until {
                return None;
            }
        }
        Some(next_ms)
    }

    /// Short human label, e.g. `Every 2 weeks on Mon, Wed`.
    pub fn describe(&self) -> String {
        let unit = match self.frequency {
            RecurrenceFrequency::Daily => "day",
            RecurrenceFrequency::Weekly => "week",
            RecurrenceFrequency::Monthly => "month",
            RecurrenceFrequency::Yearly => "year",
        };
        let mut label = if self.interval <= 1 {
            format!("Every {unit}")
        } else {
            format!("Every {} {unit}s", self.interval)
        };

        if !self.days_of_week.is_empty() {
            let days = self
                .days_of_week
                .iter()
                .filter_map(|d| WEEKDAY_LABELS.get(usize::from(*d).wrapping_sub(1)))
                .copied()
                .collect::<Vec<_>>();
            label.push_str(&format!(" on {}", days.join(", ")));
        }
        if !self.days_of_month.is_empty() {
            let days = self
                .days_of_month
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>();
            label.push_str(&format!(" on day {}", days.join(", ")));
        }

        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::AfterOccurrences(count) => label.push_str(&format!(", {count} times")),
            RecurrenceEnd::Until(until) => {
                if let Some(date) = DateTime::<Utc>::from_timestamp_millis(until) {
                    label.push_str(&format!(", until {}", date.format("%Y-%m-%d")));
                }
            }
        }
        label
    }

    fn next_weekly(&self, anchor: DateTime<Utc>, interval: u32) -> Option<DateTime<Utc>> {
        let days = sorted_unique(self.days_of_week.iter().copied());
        let Some(first) = days.first().copied() else {
            return anchor.checked_add_days(Days::new(7 * u64::from(interval)));
        };

        let current = anchor.weekday().number_from_monday() as u8;
        if let Some(later) = days.iter().find(|day| **day > current) {
            return anchor.checked_add_days(Days::new(u64::from(later - current)));
        }

        // Jump to the Monday `interval` weeks ahead, then to the first listed day.
        let offset = 7 * u64::from(interval) - u64::from(current - 1) + u64::from(first - 1);
        anchor.checked_add_days(Days::new(offset))
    }

    fn next_monthly(&self, anchor: DateTime<Utc>, interval: u32) -> Option<DateTime<Utc>> {
        let days = sorted_unique(self.days_of_month.iter().copied());
        if days.is_empty() {
            return shift_months_clamped(anchor, interval);
        }

        let current = anchor.day();
        let month_len = days_in_month(anchor.year(), anchor.month());
        if let Some(later) = days
            .iter()
            .map(|d| u32::from(*d))
            .find(|day| *day > current && *day <= month_len)
        {
            return anchor.with_day(later);
        }

        for cycle in 1..=MAX_MONTH_CYCLES {
            let (year, month) = shift_year_month(anchor.year(), anchor.month(), interval * cycle)?;
            let month_len = days_in_month(year, month);
            if let Some(day) = days
                .iter()
                .map(|d| u32::from(*d))
                .find(|day| *day <= month_len)
            {
                return at_date(anchor, year, month, day);
            }
        }
        None
    }
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

fn shift_year_month(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let total = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(months);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

fn shift_months_clamped(anchor: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    let (year, month) = shift_year_month(anchor.year(), anchor.month(), months)?;
    let day = anchor.day().min(days_in_month(year, month));
    at_date(anchor, year, month, day)
}

fn at_date(anchor: DateTime<Utc>, year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(anchor.time()).and_utc())
}

fn sorted_unique(days: impl IntoIterator<Item = u8>) -> Vec<u8> {
    let mut values = days.into_iter().collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::{days_in_month, RecurrencePattern};

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn describe_lists_weekdays() {
        let pattern = RecurrencePattern::weekly().every(2).on_weekdays([3, 1]);
        assert_eq!(pattern.describe(), "Every 2 weeks on Mon, Wed");
    }
}
