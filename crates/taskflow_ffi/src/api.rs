//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Flatten core types into plain DTOs (strings, numbers, lists).
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures come back as envelopes with `ok=false` (or empty lists) and a
//!   human-readable `message`.
//! - IDs cross the boundary as UUID strings; timestamps as epoch milliseconds.

use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;
use taskflow_core::analytics::TaskStatistics;
use taskflow_core::clock::now_epoch_ms;
use taskflow_core::db::open_db;
use taskflow_core::parse::CompositeParser;
use taskflow_core::query::filter::{sort_tasks, SortDirection, SortKey, TaskSort};
use taskflow_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use taskflow_core::service::project_service::ProjectService;
use taskflow_core::{
    core_version as core_version_inner, export_tasks, init_logging as init_logging_inner,
    collect_bundle, ping as ping_inner, search_tasks, DependencyService, ExportFormat,
    ImportService, NewTask, Project, RecurrenceEnd, RecurrenceFrequency, RecurrencePattern,
    SearchQuery, SqliteTaskRepository, Task, TaskListQuery, TaskPriority, TaskRepository,
    TaskService, TaskStatus,
};
use uuid::Uuid;

const DB_FILE_NAME: &str = "taskflow.sqlite3";
const DB_PATH_ENV: &str = "TASKFLOW_DB_PATH";
const SEARCH_DEFAULT_LIMIT: u32 = 20;
const SEARCH_LIMIT_MAX: u32 = 50;

static CONFIGURED_DB_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and an error message otherwise.
/// Repeating the call with the same `level + log_dir` is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Points every later call at the database file `path`.
///
/// Without this call the `TASKFLOW_DB_PATH` environment variable is used,
/// then `<temp>/taskflow.sqlite3`. Returns an empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "db path cannot be empty".to_string();
    }
    match CONFIGURED_DB_PATH.lock() {
        Ok(mut slot) => {
            *slot = Some(PathBuf::from(trimmed));
            String::new()
        }
        Err(_) => "db path lock poisoned".to_string(),
    }
}

/// Flattened task row for list, board and calendar views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// `pending|in_progress|completed|cancelled`.
    pub status: String,
    /// `low|medium|high|urgent`.
    pub priority: String,
    pub due_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    /// Human label of the repeat rule, e.g. `Every 2 weeks on Mon`.
    pub recurrence_label: Option<String>,
    pub subtasks_done: u32,
    pub subtasks_total: u32,
    pub is_overdue: bool,
}

/// Repeat rule input for [`task_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceInput {
    /// `daily|weekly|monthly|yearly`.
    pub frequency: String,
    pub interval: u32,
    /// ISO weekdays, Monday = 1.
    pub days_of_week: Vec<u8>,
    pub days_of_month: Vec<u8>,
    pub until: Option<i64>,
    pub count: Option<u32>,
}

/// Task create/update envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    pub ok: bool,
    pub task: Option<TaskItem>,
    /// Next occurrence generated by completing a recurring task.
    pub successor: Option<TaskItem>,
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: &Task, successor: Option<&Task>) -> Self {
        let now = now_epoch_ms();
        Self {
            ok: true,
            task: Some(to_task_item(task, now)),
            successor: successor.map(|next| to_task_item(next, now)),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            successor: None,
            message: message.into(),
        }
    }
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub items: Vec<TaskItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedItem {
    pub task_id: String,
    pub waiting_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessResponse {
    pub ready: Vec<String>,
    pub blocked: Vec<BlockedItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListResponse {
    pub items: Vec<ProjectItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    pub content: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub ok: bool,
    pub tasks_imported: u32,
    pub tasks_skipped: u32,
    pub projects_imported: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub task_id: String,
    pub title: String,
    pub status: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub message: String,
    pub applied_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsResponse {
    pub ok: bool,
    pub total: u32,
    pub pending: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub overdue: u32,
    pub completion_rate: f64,
    pub current_streak_days: u32,
    /// Oldest day first; last entry is today (UTC).
    pub completions_per_day: Vec<u32>,
    pub message: String,
}

/// Creates a task.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(
    title: String,
    description: Option<String>,
    priority: Option<String>,
    due_at: Option<i64>,
    project_id: Option<String>,
    tags: Vec<String>,
    recurrence: Option<RecurrenceInput>,
) -> TaskActionResponse {
    let request = match build_new_task(title, description, priority, due_at, project_id, tags, recurrence)
    {
        Ok(request) => request,
        Err(message) => return TaskActionResponse::failure(format!("task_create failed: {message}")),
    };
    match with_conn(|conn| {
        let service = TaskService::new(task_repo(conn)?);
        service.create_task(request).map_err(|err| err.to_string())
    }) {
        Ok(task) => TaskActionResponse::success("Task created.", &task, None),
        Err(err) => TaskActionResponse::failure(format!("task_create failed: {err}")),
    }
}

/// Creates a task from one line of text, e.g. `Pay rent tomorrow !high #home`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_quick_add(text: String) -> TaskActionResponse {
    let parsed = match CompositeParser::new().parse(&text, now_epoch_ms()) {
        Ok(parsed) => parsed,
        Err(err) => return TaskActionResponse::failure(format!("task_quick_add failed: {err}")),
    };
    match with_conn(|conn| {
        let service = TaskService::new(task_repo(conn)?);
        service
            .create_task(parsed.into_new_task())
            .map_err(|err| err.to_string())
    }) {
        Ok(task) => TaskActionResponse::success("Task created.", &task, None),
        Err(err) => TaskActionResponse::failure(format!("task_quick_add failed: {err}")),
    }
}

/// Completes an open task or reopens a completed one.
///
/// Completing a recurring task returns its next occurrence in `successor`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle_completion(task_id: String) -> TaskActionResponse {
    let result = parse_id(&task_id).and_then(|id| {
        with_conn(|conn| {
            let service = TaskService::new(task_repo(conn)?);
            service.toggle_completion(id).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(outcome) => {
            let message = if outcome.task.status == TaskStatus::Completed {
                "Task completed."
            } else {
                "Task reopened."
            };
            TaskActionResponse::success(message, &outcome.task, outcome.successor.as_ref())
        }
        Err(err) => TaskActionResponse::failure(format!("task_toggle_completion failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String) -> ActionResponse {
    let result = parse_id(&task_id).and_then(|id| {
        with_conn(|conn| {
            let service = TaskService::new(task_repo(conn)?);
            service.delete_task(id).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(()) => ActionResponse::success("Task deleted.", Some(task_id)),
        Err(err) => ActionResponse::failure(format!("task_delete failed: {err}")),
    }
}

/// Lists tasks, optionally by status and project, sorted by `sort_key`.
///
/// `sort_key` is one of `due_date|priority|created_at|updated_at|title|status`
/// and defaults to `due_date`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list(
    status: Option<String>,
    project_id: Option<String>,
    sort_key: Option<String>,
    descending: bool,
) -> TaskListResponse {
    let result = (|| {
        let mut query = TaskListQuery::default();
        if let Some(status) = status.as_deref() {
            query.statuses = vec![parse_status(status)?];
        }
        query.project_id = project_id.as_deref().map(parse_id).transpose()?;
        let sort = TaskSort::new(
            parse_sort_key(sort_key.as_deref())?,
            if descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        );
        with_conn(|conn| {
            let mut tasks = task_repo(conn)?
                .list_tasks(&query)
                .map_err(|err| err.to_string())?;
            sort_tasks(&mut tasks, sort);
            Ok(tasks)
        })
    })();

    match result {
        Ok(tasks) => {
            let now = now_epoch_ms();
            let items: Vec<TaskItem> = tasks.iter().map(|task| to_task_item(task, now)).collect();
            TaskListResponse {
                message: format!("Found {} task(s).", items.len()),
                items,
            }
        }
        Err(err) => TaskListResponse {
            items: Vec::new(),
            message: format!("tasks_list failed: {err}"),
        },
    }
}

/// Splits open tasks into ready and blocked ones.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_readiness() -> ReadinessResponse {
    let result = with_conn(|conn| {
        let repo = task_repo(conn)?;
        let query = TaskListQuery {
            statuses: vec![TaskStatus::Pending, TaskStatus::InProgress],
            ..TaskListQuery::default()
        };
        let tasks = repo.list_tasks(&query).map_err(|err| err.to_string())?;
        DependencyService::new(repo)
            .readiness(&tasks)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(readiness) => ReadinessResponse {
            message: format!(
                "{} ready, {} blocked.",
                readiness.ready.len(),
                readiness.blocked.len()
            ),
            ready: readiness.ready.iter().map(Uuid::to_string).collect(),
            blocked: readiness
                .blocked
                .into_iter()
                .map(|entry| BlockedItem {
                    task_id: entry.task_id.to_string(),
                    waiting_on: entry.waiting_on.iter().map(Uuid::to_string).collect(),
                })
                .collect(),
        },
        Err(err) => ReadinessResponse {
            ready: Vec::new(),
            blocked: Vec::new(),
            message: format!("tasks_readiness failed: {err}"),
        },
    }
}

/// Makes `task_id` wait for `prerequisite_id`. Rejects self links and cycles.
#[flutter_rust_bridge::frb(sync)]
pub fn dependency_add(task_id: String, prerequisite_id: String) -> ActionResponse {
    let result = parse_id(&task_id).and_then(|task| {
        let prerequisite = parse_id(&prerequisite_id)?;
        with_conn(|conn| {
            DependencyService::new(task_repo(conn)?)
                .add_dependency(task, prerequisite)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(()) => ActionResponse::success("Dependency added.", Some(task_id)),
        Err(err) => ActionResponse::failure(format!("dependency_add failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn dependency_remove(task_id: String, prerequisite_id: String) -> ActionResponse {
    let result = parse_id(&task_id).and_then(|task| {
        let prerequisite = parse_id(&prerequisite_id)?;
        with_conn(|conn| {
            DependencyService::new(task_repo(conn)?)
                .remove_dependency(task, prerequisite)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(()) => ActionResponse::success("Dependency removed.", Some(task_id)),
        Err(err) => ActionResponse::failure(format!("dependency_remove failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn project_create(name: String, color: Option<String>) -> ActionResponse {
    let result = with_conn(|conn| {
        let repo = SqliteProjectRepository::try_new(conn).map_err(|err| err.to_string())?;
        ProjectService::new(repo)
            .create_project(&name, None, color)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(project) => ActionResponse::success("Project created.", Some(project.id.to_string())),
        Err(err) => ActionResponse::failure(format!("project_create failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn projects_list(include_archived: bool) -> ProjectListResponse {
    let result = with_conn(|conn| {
        let repo = SqliteProjectRepository::try_new(conn).map_err(|err| err.to_string())?;
        repo.list_projects(include_archived)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(projects) => ProjectListResponse {
            message: format!("Found {} project(s).", projects.len()),
            items: projects.into_iter().map(to_project_item).collect(),
        },
        Err(err) => ProjectListResponse {
            items: Vec::new(),
            message: format!("projects_list failed: {err}"),
        },
    }
}

/// Exports every task, project and category as `json|csv|text`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_export(format: String) -> ExportResponse {
    let Some(format) = ExportFormat::parse(&format) else {
        return ExportResponse {
            ok: false,
            content: String::new(),
            message: format!("tasks_export failed: unsupported format `{format}`"),
        };
    };
    let result = with_conn(|conn| {
        let bundle = collect_bundle(conn, now_epoch_ms()).map_err(|err| err.to_string())?;
        export_tasks(&bundle, format).map_err(|err| err.to_string())
    });
    match result {
        Ok(content) => ExportResponse {
            ok: true,
            content,
            message: "Export ready.".to_string(),
        },
        Err(err) => ExportResponse {
            ok: false,
            content: String::new(),
            message: format!("tasks_export failed: {err}"),
        },
    }
}

/// Imports a JSON bundle produced by [`tasks_export`]; existing IDs are skipped.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_import_json(json: String) -> ImportResponse {
    let result = with_conn(|conn| {
        ImportService::try_new(conn)
            .map_err(|err| err.to_string())?
            .import_json(&json)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(report) => ImportResponse {
            ok: true,
            tasks_imported: report.tasks_imported,
            tasks_skipped: report.tasks_skipped,
            projects_imported: report.projects_imported,
            message: format!(
                "Imported {} task(s), skipped {}.",
                report.tasks_imported, report.tasks_skipped
            ),
        },
        Err(err) => ImportResponse {
            ok: false,
            tasks_imported: 0,
            tasks_skipped: 0,
            projects_imported: 0,
            message: format!("tasks_import_json failed: {err}"),
        },
    }
}

/// Full-text search over task titles and descriptions.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_search(text: String, limit: Option<u32>) -> SearchResponse {
    let applied_limit = normalize_search_limit(limit);
    let query = SearchQuery {
        limit: applied_limit,
        ..SearchQuery::new(text.trim())
    };
    let result = with_conn(|conn| search_tasks(conn, &query).map_err(|err| err.to_string()));
    match result {
        Ok(hits) => {
            let items: Vec<SearchItem> = hits
                .into_iter()
                .map(|hit| SearchItem {
                    task_id: hit.task_id.to_string(),
                    title: hit.title,
                    status: hit.status.as_str().to_string(),
                    snippet: hit.snippet,
                })
                .collect();
            let message = if items.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", items.len())
            };
            SearchResponse {
                items,
                message,
                applied_limit,
            }
        }
        Err(err) => SearchResponse {
            items: Vec::new(),
            message: format!("tasks_search failed: {err}"),
            applied_limit,
        },
    }
}

/// Dashboard statistics over every stored task.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_statistics() -> StatisticsResponse {
    let result = with_conn(|conn| {
        task_repo(conn)?
            .list_tasks(&TaskListQuery::default())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(tasks) => {
            let stats = TaskStatistics::compute(&tasks, now_epoch_ms());
            StatisticsResponse {
                ok: true,
                total: stats.total,
                pending: stats.by_status.pending,
                in_progress: stats.by_status.in_progress,
                completed: stats.by_status.completed,
                cancelled: stats.by_status.cancelled,
                overdue: stats.overdue,
                completion_rate: stats.completion_rate,
                current_streak_days: stats.current_streak_days,
                completions_per_day: stats
                    .completions_per_day
                    .iter()
                    .map(|day| day.completed)
                    .collect(),
                message: "Statistics ready.".to_string(),
            }
        }
        Err(err) => StatisticsResponse {
            ok: false,
            total: 0,
            pending: 0,
            in_progress: 0,
            completed: 0,
            cancelled: 0,
            overdue: 0,
            completion_rate: 0.0,
            current_streak_days: 0,
            completions_per_day: Vec::new(),
            message: format!("tasks_statistics failed: {err}"),
        },
    }
}

fn resolve_db_path() -> PathBuf {
    if let Ok(slot) = CONFIGURED_DB_PATH.lock() {
        if let Some(path) = slot.as_ref() {
            return path.clone();
        }
    }
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DB_FILE_NAME)
}

fn with_conn<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let conn = open_db(resolve_db_path()).map_err(|err| {
        warn!("event=ffi_db_open module=ffi status=error error={err}");
        format!("DB open failed: {err}")
    })?;
    f(&conn)
}

fn task_repo(conn: &Connection) -> Result<SqliteTaskRepository<'_>, String> {
    SqliteTaskRepository::try_new(conn).map_err(|err| format!("task repo init failed: {err}"))
}

fn parse_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid id `{value}`"))
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value.trim()).ok_or_else(|| format!("unknown status `{value}`"))
}

fn parse_sort_key(value: Option<&str>) -> Result<SortKey, String> {
    match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("due_date") => Ok(SortKey::DueDate),
        Some("priority") => Ok(SortKey::Priority),
        Some("created_at") => Ok(SortKey::CreatedAt),
        Some("updated_at") => Ok(SortKey::UpdatedAt),
        Some("title") => Ok(SortKey::Title),
        Some("status") => Ok(SortKey::Status),
        Some(other) => Err(format!("unknown sort key `{other}`")),
    }
}

fn build_new_task(
    title: String,
    description: Option<String>,
    priority: Option<String>,
    due_at: Option<i64>,
    project_id: Option<String>,
    tags: Vec<String>,
    recurrence: Option<RecurrenceInput>,
) -> Result<NewTask, String> {
    let priority = match priority.as_deref().map(str::trim) {
        None | Some("") => TaskPriority::default(),
        Some(raw) => TaskPriority::parse(raw).ok_or_else(|| format!("unknown priority `{raw}`"))?,
    };
    Ok(NewTask {
        title,
        description,
        priority,
        due_at,
        project_id: project_id.as_deref().map(parse_id).transpose()?,
        tags,
        recurrence: recurrence.map(to_pattern).transpose()?,
        ..NewTask::default()
    })
}

fn to_pattern(input: RecurrenceInput) -> Result<RecurrencePattern, String> {
    let frequency = match input.frequency.trim().to_ascii_lowercase().as_str() {
        "daily" => RecurrenceFrequency::Daily,
        "weekly" => RecurrenceFrequency::Weekly,
        "monthly" => RecurrenceFrequency::Monthly,
        "yearly" => RecurrenceFrequency::Yearly,
        other => return Err(format!("unknown frequency `{other}`")),
    };
    let end = match (input.until, input.count) {
        (Some(until), _) => RecurrenceEnd::Until(until),
        (None, Some(count)) => RecurrenceEnd::AfterOccurrences(count),
        (None, None) => RecurrenceEnd::Never,
    };
    let pattern = RecurrencePattern::new(frequency)
        .every(input.interval)
        .on_weekdays(input.days_of_week)
        .on_days_of_month(input.days_of_month)
        .ending(end);
    pattern.validate().map_err(|err| err.to_string())?;
    Ok(pattern)
}

fn normalize_search_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => SEARCH_DEFAULT_LIMIT,
        Some(value) => value.min(SEARCH_LIMIT_MAX),
    }
}

fn to_task_item(task: &Task, now_ms: i64) -> TaskItem {
    let (done, total) = task.subtask_progress();
    TaskItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status.as_str().to_string(),
        priority: task.priority.as_str().to_string(),
        due_at: task.due_at,
        completed_at: task.completed_at,
        project_id: task.project_id.map(|id| id.to_string()),
        tags: task.tags.clone(),
        dependencies: task.dependencies.iter().map(Uuid::to_string).collect(),
        recurrence_label: task.recurrence.as_ref().map(RecurrencePattern::describe),
        subtasks_done: done as u32,
        subtasks_total: total as u32,
        is_overdue: task.is_overdue(now_ms),
    }
}

fn to_project_item(project: Project) -> ProjectItem {
    ProjectItem {
        id: project.id.to_string(),
        name: project.name,
        color: project.color,
        is_archived: project.is_archived,
    }
}
