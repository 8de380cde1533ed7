//! Keyword search over task titles and descriptions.
//!
//! # Invariants
//! - `tasks_fts` mirrors `tasks` through triggers; rows are joined back on
//!   `task_uuid`, so deleted tasks never show up.
//! - Plain queries match every whitespace-separated term (AND), each term
//!   quoted so FTS5 operators in user text stay literal.
//! - Ties in rank fall back to most recently updated, then UUID.

use crate::db::DbError;
use crate::model::project::ProjectId;
use crate::model::task::{TaskId, TaskStatus};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DEFAULT_LIMIT: u32 = 20;
const SNIPPET_TOKENS: u32 = 10;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// FTS5 rejected the match expression.
    InvalidQuery { query: String, message: String },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "cannot search for `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "corrupt search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Empty means any status.
    pub statuses: Vec<TaskStatus>,
    pub project_id: Option<ProjectId>,
    pub limit: u32,
    /// Hand `text` to FTS5 unchanged (prefix `*`, `OR`, `NEAR`, column filters).
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            statuses: Vec::new(),
            project_id: None,
            limit: DEFAULT_LIMIT,
            raw_fts_syntax: false,
        }
    }

    fn match_expression(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else if self.raw_fts_syntax {
            Some(text.to_string())
        } else {
            Some(
                text.split_whitespace()
                    .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub task_id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    /// Best matching fragment, hits wrapped in `[` and `]`.
    pub snippet: String,
}

/// Runs `query` against the task index, best matches first.
///
/// Blank text or a zero limit yields no hits without touching the database.
pub fn search_tasks(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(expression) = query.match_expression() else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = format!(
        "SELECT t.uuid, t.title, t.status,
                snippet(tasks_fts, -1, '[', ']', ' ... ', {SNIPPET_TOKENS})
         FROM tasks_fts
         INNER JOIN tasks t ON t.uuid = tasks_fts.task_uuid
         WHERE tasks_fts MATCH ?"
    );
    let mut bind_values = vec![Value::Text(expression.clone())];
    if !query.statuses.is_empty() {
        sql.push_str(&format!(
            " AND t.status IN ({})",
            vec!["?"; query.statuses.len()].join(", ")
        ));
        bind_values.extend(
            query
                .statuses
                .iter()
                .map(|status| Value::Text(status.as_str().to_string())),
        );
    }
    if let Some(project_id) = query.project_id {
        sql.push_str(" AND t.project_uuid = ?");
        bind_values.push(Value::Text(project_id.to_string()));
    }
    sql.push_str(" ORDER BY bm25(tasks_fts) ASC, t.updated_at DESC, t.uuid ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let as_search_error = |err: rusqlite::Error| classify_error(err, &expression);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(as_search_error)?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next().map_err(as_search_error)? {
        hits.push(hit_from_row(row)?);
    }

    debug!(
        "event=task_search module=search status=ok hits={} raw={}",
        hits.len(),
        query.raw_fts_syntax
    );
    Ok(hits)
}

fn hit_from_row(row: &Row<'_>) -> SearchResult<SearchHit> {
    let uuid_text: String = row.get(0)?;
    let status_text: String = row.get(2)?;
    Ok(SearchHit {
        task_id: Uuid::parse_str(&uuid_text)
            .map_err(|_| SearchError::InvalidData(format!("task uuid `{uuid_text}`")))?,
        title: row.get(1)?,
        status: TaskStatus::parse(&status_text)
            .ok_or_else(|| SearchError::InvalidData(format!("task status `{status_text}`")))?,
        snippet: row.get(3)?,
    })
}

/// Separates FTS5 parse failures (user input) from storage failures.
fn classify_error(err: rusqlite::Error, expression: &str) -> SearchError {
    let syntax_message = match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let lowered = message.to_lowercase();
            let is_syntax = lowered.contains("fts5")
                || lowered.contains("syntax error")
                || lowered.contains("unterminated")
                || lowered.contains("no such column");
            is_syntax.then(|| message.clone())
        }
        _ => None,
    };
    match syntax_message {
        Some(message) => SearchError::InvalidQuery {
            query: expression.to_string(),
            message,
        },
        None => SearchError::Db(DbError::Sqlite(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::SearchQuery;

    #[test]
    fn plain_terms_are_quoted_and_and_joined() {
        let query = SearchQuery::new(r#" pay "rent" "#);
        assert_eq!(
            query.match_expression().as_deref(),
            Some(r#""pay" AND """rent""""#)
        );
    }

    #[test]
    fn raw_text_passes_through_trimmed() {
        let mut query = SearchQuery::new("  rep* OR invoice ");
        query.raw_fts_syntax = true;
        assert_eq!(query.match_expression().as_deref(), Some("rep* OR invoice"));
    }

    #[test]
    fn blank_text_has_no_expression() {
        assert!(SearchQuery::new(" \t ").match_expression().is_none());
    }
}
