//! Quick-add text parsing.
//!
//! # Responsibility
//! - Turn a one-line entry such as `Pay rent tomorrow !high #home` into task
//!   fields.
//! - Offer a parser seam so smarter (remote) parsers can run first and fall
//!   back to local rules.
//!
//! # Invariants
//! - Parsing never fails on unrecognized words; they stay in the title.
//! - Dates resolve against the caller's `now`, on UTC calendar days.
//! - A date without a time of day is due at 23:59 UTC.

use crate::model::recurrence::RecurrencePattern;
use crate::model::task::TaskPriority;
use crate::repo::tag_repo::normalize_tags;
use crate::service::task_service::NewTask;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime};
use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::error::Error;
use std::fmt::{Display, Formatter};

static RECURRENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bevery\s+(?:(\d+)\s+)?(days?|weeks?|months?|years?|weekdays?|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .expect("valid recurrence regex")
});
static IN_DAYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s+(\d{1,3})\s+(days?|weeks?)\b").expect("valid relative date regex")
});
static DAY_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(today|tonight|tomorrow)\b").expect("valid day word regex"));
static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(?:on|next)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("valid weekday regex")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("valid time regex")
});
static PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)!(low|medium|med|high|urgent|[1-4])\b").expect("valid priority regex")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#([\p{L}\p{N}_-]+)").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const END_OF_DAY_HOUR: u32 = 23;
const END_OF_DAY_MINUTE: u32 = 59;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyInput,
    /// Only markers were given; nothing is left for the title.
    MissingTitle,
    /// A registered parser failed; carries its name and message.
    Parser { parser: String, message: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "quick-add text must not be empty"),
            Self::MissingTitle => write!(f, "quick-add text has no title besides markers"),
            Self::Parser { parser, message } => write!(f, "parser `{parser}` failed: {message}"),
        }
    }
}

impl Error for ParseError {}

/// Task fields extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<i64>,
    pub tags: Vec<String>,
    pub recurrence: Option<RecurrencePattern>,
}

impl ParsedTask {
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            priority: self.priority.unwrap_or_default(),
            due_at: self.due_at,
            tags: self.tags,
            recurrence: self.recurrence,
            ..NewTask::default()
        }
    }
}

/// Converts free text into task fields.
pub trait TaskTextParser {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;
    fn parse(&self, input: &str, now_ms: i64) -> Result<ParsedTask, ParseError>;
}

/// Local keyword-based parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedParser;

impl TaskTextParser for RuleBasedParser {
    fn name(&self) -> &str {
        "rules"
    }

    fn parse(&self, input: &str, now_ms: i64) -> Result<ParsedTask, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let today = DateTime::from_timestamp_millis(now_ms)
            .map(|value| value.date_naive())
            .unwrap_or_default();
        let mut text = input.to_string();
        let mut parsed = ParsedTask::default();
        let mut due_day: Option<NaiveDate> = None;

        if let Some(caps) = RECURRENCE_RE.captures(&text) {
            let interval = caps
                .get(1)
                .and_then(|value| value.as_str().parse::<u32>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(1);
            let unit = caps[2].to_lowercase();
            let (pattern, first_day) = recurrence_for(&unit, interval, today);
            parsed.recurrence = Some(pattern);
            due_day = Some(first_day);
            text = remove_match(&text, &caps);
        }

        if let Some(caps) = IN_DAYS_RE.captures(&text) {
            let count: u64 = caps[1].parse().unwrap_or(0);
            let days = if caps[2].to_lowercase().starts_with("week") {
                count * 7
            } else {
                count
            };
            due_day = today.checked_add_days(Days::new(days));
            text = remove_match(&text, &caps);
        } else if let Some(caps) = DAY_WORD_RE.captures(&text) {
            due_day = match caps[1].to_lowercase().as_str() {
                "tomorrow" => today.succ_opt(),
                _ => Some(today),
            };
            text = remove_match(&text, &caps);
        } else if let Some(caps) = WEEKDAY_RE.captures(&text) {
            if let Some(weekday) = weekday_number(&caps[1]) {
                due_day = Some(next_weekday(today, weekday));
            }
            text = remove_match(&text, &caps);
        }

        let mut time = NaiveTime::from_hms_opt(END_OF_DAY_HOUR, END_OF_DAY_MINUTE, 0);
        if let Some(caps) = TIME_RE.captures(&text) {
            if let Some(parsed_time) = parse_time(&caps) {
                time = Some(parsed_time);
                due_day.get_or_insert(today);
                text = remove_match(&text, &caps);
            }
        }
        parsed.due_at = match (due_day, time) {
            (Some(day), Some(time)) => Some(day.and_time(time).and_utc().timestamp_millis()),
            _ => None,
        };

        if let Some(caps) = PRIORITY_RE.captures(&text) {
            parsed.priority = parse_priority(&caps[1]);
            text = remove_match(&text, &caps);
        }

        let tags: Vec<String> = TAG_RE
            .captures_iter(&text)
            .map(|caps| caps[1].to_string())
            .collect();
        parsed.tags = normalize_tags(&tags);
        let text = TAG_RE.replace_all(&text, " ");

        parsed.title = WHITESPACE_RE.replace_all(text.trim(), " ").to_string();
        if parsed.title.is_empty() {
            return Err(ParseError::MissingTitle);
        }
        Ok(parsed)
    }
}

/// Tries registered parsers in order, then falls back to [`RuleBasedParser`].
#[derive(Default)]
pub struct CompositeParser {
    parsers: Vec<Box<dyn TaskTextParser + Send + Sync>>,
    fallback: RuleBasedParser,
}

impl CompositeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Box<dyn TaskTextParser + Send + Sync>) {
        self.parsers.push(parser);
    }

    pub fn parse(&self, input: &str, now_ms: i64) -> Result<ParsedTask, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }
        for parser in &self.parsers {
            match parser.parse(input, now_ms) {
                Ok(parsed) if !parsed.title.trim().is_empty() => return Ok(parsed),
                Ok(_) => warn!(
                    "event=quick_add_parse module=parse status=error parser={} error_code=blank_title",
                    parser.name()
                ),
                Err(err) => warn!(
                    "event=quick_add_parse module=parse status=error parser={} error={}",
                    parser.name(),
                    err
                ),
            }
        }
        self.fallback.parse(input, now_ms)
    }
}

fn remove_match(text: &str, caps: &Captures<'_>) -> String {
    match caps.get(0) {
        Some(found) => format!("{} {}", &text[..found.start()], &text[found.end()..]),
        None => text.to_string(),
    }
}

/// Builds the pattern for `unit` and the first due day on or after `today`.
fn recurrence_for(unit: &str, interval: u32, today: NaiveDate) -> (RecurrencePattern, NaiveDate) {
    if let Some(weekday) = weekday_number(unit) {
        let pattern = RecurrencePattern::weekly()
            .every(interval)
            .on_weekdays([weekday]);
        return (pattern, upcoming_weekday(today, weekday));
    }
    let pattern = match unit {
        "day" | "days" => RecurrencePattern::daily(),
        "week" | "weeks" => RecurrencePattern::weekly(),
        "month" | "months" => RecurrencePattern::monthly(),
        "year" | "years" => RecurrencePattern::yearly(),
        _ => RecurrencePattern::weekly().on_weekdays([1, 2, 3, 4, 5]),
    };
    let first_day = if pattern.days_of_week.is_empty() {
        today
    } else {
        let mut day = today;
        while day.weekday().number_from_monday() > 5 {
            day = day.succ_opt().unwrap_or(day);
        }
        day
    };
    (pattern.every(interval), first_day)
}

fn weekday_number(name: &str) -> Option<u8> {
    match name.to_lowercase().as_str() {
        "monday" => Some(1),
        "tuesday" => Some(2),
        "wednesday" => Some(3),
        "thursday" => Some(4),
        "friday" => Some(5),
        "saturday" => Some(6),
        "sunday" => Some(7),
        _ => None,
    }
}

/// Next date strictly after `today` falling on ISO `weekday`.
fn next_weekday(today: NaiveDate, weekday: u8) -> NaiveDate {
    let current = today.weekday().number_from_monday() as u8;
    let ahead = (weekday + 7 - current) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today
        .checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or(today)
}

/// Today when it matches `weekday`, else [`next_weekday`].
fn upcoming_weekday(today: NaiveDate, weekday: u8) -> NaiveDate {
    if today.weekday().number_from_monday() as u8 == weekday {
        today
    } else {
        next_weekday(today, weekday)
    }
}

fn parse_time(caps: &Captures<'_>) -> Option<NaiveTime> {
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .map_or(Some(0), |value| value.as_str().parse().ok())?;
    match caps.get(3).map(|value| value.as_str().to_lowercase()).as_deref() {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_priority(value: &str) -> Option<TaskPriority> {
    match value.to_lowercase().as_str() {
        "low" | "1" => Some(TaskPriority::Low),
        "medium" | "med" | "2" => Some(TaskPriority::Medium),
        "high" | "3" => Some(TaskPriority::High),
        "urgent" | "4" => Some(TaskPriority::Urgent),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositeParser, ParseError, ParsedTask, RuleBasedParser, TaskTextParser};
    use crate::model::recurrence::RecurrenceFrequency;
    use crate::model::task::TaskPriority;
    use chrono::NaiveDate;

    // 2026-03-04 is a Wednesday.
    fn now() -> i64 {
        NaiveDate::from_ymd_opt(2026, 3, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    #[test]
    fn extracts_markers_and_keeps_title() {
        let parsed = RuleBasedParser
            .parse("Pay rent tomorrow !high #Home #bills", now())
            .unwrap();
        assert_eq!(parsed.title, "Pay rent");
        assert_eq!(parsed.priority, Some(TaskPriority::High));
        assert_eq!(parsed.tags, vec!["bills".to_string(), "home".to_string()]);
        assert_eq!(parsed.due_at, Some(at(2026, 3, 5, 23, 59)));
    }

    #[test]
    fn weekday_and_time_resolve_forward() {
        let parsed = RuleBasedParser
            .parse("call mom on monday at 5pm", now())
            .unwrap();
        assert_eq!(parsed.title, "call mom");
        assert_eq!(parsed.due_at, Some(at(2026, 3, 9, 17, 0)));
    }

    #[test]
    fn recurrence_phrase_sets_pattern_and_first_due() {
        let parsed = RuleBasedParser
            .parse("water plants every 2 weeks", now())
            .unwrap();
        let pattern = parsed.recurrence.unwrap();
        assert_eq!(pattern.frequency, RecurrenceFrequency::Weekly);
        assert_eq!(pattern.interval, 2);
        assert_eq!(parsed.due_at, Some(at(2026, 3, 4, 23, 59)));
        assert_eq!(parsed.title, "water plants");
    }

    #[test]
    fn markers_only_is_rejected() {
        assert_eq!(
            RuleBasedParser.parse("#home !low", now()),
            Err(ParseError::MissingTitle)
        );
    }

    struct FailingParser;

    impl TaskTextParser for FailingParser {
        fn name(&self) -> &str {
            "remote"
        }

        fn parse(&self, _input: &str, _now_ms: i64) -> Result<ParsedTask, ParseError> {
            Err(ParseError::Parser {
                parser: "remote".to_string(),
                message: "offline".to_string(),
            })
        }
    }

    #[test]
    fn composite_falls_back_to_rules() {
        let mut parser = CompositeParser::new();
        parser.register(Box::new(FailingParser));
        let parsed = parser.parse("review PR in 3 days", now()).unwrap();
        assert_eq!(parsed.title, "review PR");
        assert_eq!(parsed.due_at, Some(at(2026, 3, 7, 23, 59)));
    }
}
