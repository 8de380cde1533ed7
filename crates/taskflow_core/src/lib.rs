//! Core domain logic for TaskFlow.
//! This crate is the single source of truth for task, recurrence and
//! dependency invariants; UI layers call it through `taskflow_ffi`.

pub mod analytics;
pub mod clock;
pub mod db;
pub mod export;
pub mod graph;
pub mod logging;
pub mod model;
pub mod parse;
pub mod query;
pub mod repo;
pub mod search;
pub mod service;

pub use analytics::TaskStatistics;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use export::{
    collect_bundle, export_tasks, import_json, ExportBundle, ExportError, ExportFormat,
    ImportReport, ImportService,
};
pub use graph::{DependencyGraph, GraphError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::project::{Project, ProjectId};
pub use model::recurrence::{RecurrenceEnd, RecurrenceFrequency, RecurrencePattern};
pub use model::task::{Subtask, Task, TaskId, TaskPriority, TaskStatus, TaskValidationError};
pub use query::filter::{SortDirection, SortKey, TaskFilter, TaskSort};
pub use repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use search::fts::{search_tasks, SearchError, SearchHit, SearchQuery};
pub use service::dependency_service::{DependencyError, DependencyService, Readiness};
pub use service::task_service::{CompletionOutcome, NewTask, TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
