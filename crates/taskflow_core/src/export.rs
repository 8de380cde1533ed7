//! Task export and import.
//!
//! # Responsibility
//! - Render a snapshot of tasks and projects as JSON, CSV or plain text.
//! - Read JSON snapshots back and merge them into storage.
//!
//! # Invariants
//! - Only JSON round-trips; CSV and text are one-way views.
//! - Import never overwrites an existing record with the same ID.
//! - Every imported task, project and category passes validation before any
//!   write happens.
//! - An import commits as a whole; a failing write leaves storage untouched.

use crate::graph::DependencyGraph;
use crate::model::category::{Category, CategoryId, CategoryValidationError};
use crate::model::project::{Project, ProjectId, ProjectValidationError};
use crate::model::task::{Task, TaskId, TaskStatus, TaskValidationError};
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
use crate::repo::{write_atomically, RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Bundle layout version written by this build.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

const CSV_HEADER: &str = "id,title,description,status,priority,due_at,completed_at,created_at,project_id,tags,subtasks_done,subtasks_total,recurrence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "text" | "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Self-contained snapshot of user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub format_version: u32,
    pub exported_at: i64,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl ExportBundle {
    pub fn new(exported_at: i64, tasks: Vec<Task>, projects: Vec<Project>) -> Self {
        Self {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at,
            tasks,
            projects,
            categories: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum ExportError {
    Serialize(serde_json::Error),
    /// Input is not a JSON bundle.
    MalformedJson(serde_json::Error),
    UnsupportedVersion(u32),
    InvalidTask {
        task_id: TaskId,
        source: TaskValidationError,
    },
    InvalidProject(ProjectValidationError),
    InvalidCategory(CategoryValidationError),
    Repo(RepoError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize export: {err}"),
            Self::MalformedJson(err) => write!(f, "import file is not a valid bundle: {err}"),
            Self::UnsupportedVersion(version) => write!(
                f,
                "unsupported export format version {version}; expected {EXPORT_FORMAT_VERSION}"
            ),
            Self::InvalidTask { task_id, source } => {
                write!(f, "invalid task {task_id} in import: {source}")
            }
            Self::InvalidProject(err) => write!(f, "invalid project in import: {err}"),
            Self::InvalidCategory(err) => write!(f, "invalid category in import: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) | Self::MalformedJson(err) => Some(err),
            Self::InvalidTask { source, .. } => Some(source),
            Self::InvalidProject(err) => Some(err),
            Self::InvalidCategory(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::UnsupportedVersion(_) => None,
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ExportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Reads every task, project and category into one bundle.
pub fn collect_bundle(conn: &Connection, exported_at: i64) -> RepoResult<ExportBundle> {
    let tasks = SqliteTaskRepository::try_new(conn)?.list_tasks(&TaskListQuery::default())?;
    let projects = SqliteProjectRepository::try_new(conn)?.list_projects(true)?;
    let mut bundle = ExportBundle::new(exported_at, tasks, projects);
    bundle.categories = SqliteCategoryRepository::try_new(conn)?.list_categories()?;
    Ok(bundle)
}

/// Renders `bundle` in the requested format.
pub fn export_tasks(bundle: &ExportBundle, format: ExportFormat) -> ExportResult<String> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(bundle).map_err(ExportError::Serialize),
        ExportFormat::Csv => Ok(to_csv(&bundle.tasks)),
        ExportFormat::Text => Ok(to_text(bundle)),
    }
}

/// Parses and validates a JSON bundle.
pub fn import_json(text: &str) -> ExportResult<ExportBundle> {
    let bundle: ExportBundle = serde_json::from_str(text).map_err(ExportError::MalformedJson)?;
    if bundle.format_version == 0 || bundle.format_version > EXPORT_FORMAT_VERSION {
        return Err(ExportError::UnsupportedVersion(bundle.format_version));
    }
    for project in &bundle.projects {
        project.validate().map_err(ExportError::InvalidProject)?;
    }
    for category in &bundle.categories {
        category.validate().map_err(ExportError::InvalidCategory)?;
    }
    for task in &bundle.tasks {
        task.validate().map_err(|source| ExportError::InvalidTask {
            task_id: task.id,
            source,
        })?;
    }
    Ok(bundle)
}

fn to_csv(tasks: &[Task]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for task in tasks {
        let (done, total) = task.subtask_progress();
        let fields = [
            task.id.to_string(),
            task.title.clone(),
            task.description.clone().unwrap_or_default(),
            task.status.as_str().to_string(),
            task.priority.as_str().to_string(),
            task.due_at.map(format_timestamp).unwrap_or_default(),
            task.completed_at.map(format_timestamp).unwrap_or_default(),
            format_timestamp(task.created_at),
            task.project_id.map(|id| id.to_string()).unwrap_or_default(),
            task.tags.join(";"),
            done.to_string(),
            total.to_string(),
            task.recurrence
                .as_ref()
                .map(|pattern| pattern.describe())
                .unwrap_or_default(),
        ];
        let row = fields
            .iter()
            .map(|field| escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

/// Quotes a field when it holds a delimiter, quote or line break.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn to_text(bundle: &ExportBundle) -> String {
    let project_names: HashMap<_, _> = bundle
        .projects
        .iter()
        .map(|project| (project.id, project.name.as_str()))
        .collect();

    let mut out = String::new();
    for task in &bundle.tasks {
        let marker = match task.status {
            TaskStatus::Completed => "[x]",
            TaskStatus::Cancelled => "[-]",
            TaskStatus::InProgress => "[~]",
            TaskStatus::Pending => "[ ]",
        };
        out.push_str(&format!("{marker} {}", task.title));

        let mut details = vec![task.priority.as_str().to_string()];
        if let Some(due_at) = task.due_at {
            details.push(format!("due {}", format_date(due_at)));
        }
        if let Some(name) = task.project_id.and_then(|id| project_names.get(&id)) {
            details.push(format!("project {name}"));
        }
        if let Some(pattern) = task.recurrence.as_ref() {
            details.push(pattern.describe());
        }
        out.push_str(&format!(" ({})", details.join(", ")));
        for tag in &task.tags {
            out.push_str(&format!(" #{tag}"));
        }
        out.push('\n');

        if let Some(description) = task.description.as_deref() {
            for line in description.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
        for subtask in &task.subtasks {
            let mark = if subtask.is_completed { "x" } else { " " };
            out.push_str(&format!("    - [{mark}] {}\n", subtask.title));
        }
    }
    out
}

fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|value| value.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn format_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

/// Counts reported by [`ImportService::import_bundle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub projects_imported: u32,
    pub projects_skipped: u32,
    pub categories_imported: u32,
    pub categories_skipped: u32,
    pub tasks_imported: u32,
    pub tasks_skipped: u32,
    /// Imported edges left out because they would close a cycle.
    pub dependencies_dropped: u32,
}

/// Merges bundles into a migrated database.
pub struct ImportService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ImportService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        BundleWriter::try_new(conn)?;
        Ok(Self { conn })
    }

    /// Parses `text` and imports it.
    pub fn import_json(&self, text: &str) -> ExportResult<ImportReport> {
        let bundle = import_json(text)?;
        self.import_bundle(&bundle)
    }

    /// Inserts projects, categories, then tasks whose IDs are not stored yet.
    ///
    /// Links to records that exist neither in storage nor in the bundle are
    /// dropped. Series links and dependencies are written after every task
    /// row exists, and an edge that would close a cycle is skipped. The whole
    /// import is one transaction.
    pub fn import_bundle(&self, bundle: &ExportBundle) -> ExportResult<ImportReport> {
        let report = write_atomically(self.conn, |conn| BundleWriter::try_new(conn)?.write(bundle))
            .map_err(|err| {
                warn!("event=tasks_import module=export status=error error={err}");
                err
            })?;

        info!(
            "event=tasks_import module=export status=ok tasks_imported={} tasks_skipped={} projects_imported={} categories_imported={} dependencies_dropped={}",
            report.tasks_imported,
            report.tasks_skipped,
            report.projects_imported,
            report.categories_imported,
            report.dependencies_dropped
        );
        Ok(report)
    }
}

/// Repositories bound to the import transaction.
struct BundleWriter<'conn> {
    tasks: SqliteTaskRepository<'conn>,
    projects: SqliteProjectRepository<'conn>,
    categories: SqliteCategoryRepository<'conn>,
}

impl<'conn> BundleWriter<'conn> {
    fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            tasks: SqliteTaskRepository::try_new(conn)?,
            projects: SqliteProjectRepository::try_new(conn)?,
            categories: SqliteCategoryRepository::try_new(conn)?,
        })
    }

    fn write(&self, bundle: &ExportBundle) -> ExportResult<ImportReport> {
        let mut report = ImportReport::default();

        for project in &bundle.projects {
            if self.projects.get_project(project.id)?.is_some() {
                report.projects_skipped += 1;
                continue;
            }
            self.projects.create_project(project)?;
            report.projects_imported += 1;
        }

        let category_ids = self.import_categories(&bundle.categories, &mut report)?;

        let mut pending: Vec<&Task> = Vec::new();
        for task in &bundle.tasks {
            if self.tasks.get_task(task.id)?.is_some() {
                report.tasks_skipped += 1;
            } else {
                pending.push(task);
            }
        }
        pending.sort_by_key(|task| (task.occurrence_index, task.created_at, task.id));

        let mut known: HashSet<TaskId> = bundle.tasks.iter().map(|task| task.id).collect();
        let linked_ids: Vec<TaskId> = pending
            .iter()
            .flat_map(|task| {
                task.recurrence_parent_id
                    .into_iter()
                    .chain(task.recurrence_source_id)
                    .chain(task.dependencies.iter().copied())
            })
            .collect();
        known.extend(self.tasks.task_statuses(&linked_ids)?.into_keys());

        // Rows go in unlinked so the order inside a series does not matter.
        let mut rows = Vec::with_capacity(pending.len());
        for task in &pending {
            let mut row = (*task).clone();
            row.dependencies = Vec::new();
            row.recurrence_parent_id = None;
            row.recurrence_source_id = None;
            row.category_id = row
                .category_id
                .and_then(|id| category_ids.get(&id).copied());
            if let Some(project_id) = row.project_id {
                if !self.project_exists(project_id)? {
                    row.project_id = None;
                }
            }
            self.tasks.create_task(&row)?;
            rows.push(row);
            report.tasks_imported += 1;
        }

        for (task, mut row) in pending.iter().zip(rows) {
            row.recurrence_parent_id = task.recurrence_parent_id.filter(|id| known.contains(id));
            row.recurrence_source_id = match task.recurrence_source_id {
                Some(source_id)
                    if known.contains(&source_id)
                        && self.tasks.find_successor(source_id)?.is_none() =>
                {
                    Some(source_id)
                }
                _ => None,
            };
            if row.recurrence_parent_id.is_some() || row.recurrence_source_id.is_some() {
                self.tasks.update_task(&row)?;
            }
        }

        let mut graph = DependencyGraph::from_edges(self.tasks.dependency_edges()?);
        for task in pending {
            let mut dependencies = Vec::with_capacity(task.dependencies.len());
            for prerequisite in task.dependencies.iter().copied() {
                if !known.contains(&prerequisite) {
                    continue;
                }
                match graph.add_edge(task.id, prerequisite) {
                    Ok(()) => dependencies.push(prerequisite),
                    Err(err) => {
                        warn!(
                            "event=tasks_import module=export status=degraded task_id={} prerequisite_id={} error={}",
                            task.id, prerequisite, err
                        );
                        report.dependencies_dropped += 1;
                    }
                }
            }
            if !dependencies.is_empty() {
                self.tasks.set_dependencies(task.id, &dependencies)?;
            }
        }

        Ok(report)
    }

    /// Imports categories and returns how bundle IDs map to stored IDs.
    ///
    /// A category whose name is already taken, in storage or earlier in the
    /// same bundle, maps onto that category.
    fn import_categories(
        &self,
        categories: &[Category],
        report: &mut ImportReport,
    ) -> ExportResult<HashMap<CategoryId, CategoryId>> {
        let mut taken: Vec<(String, CategoryId)> = self
            .categories
            .list_categories()?
            .into_iter()
            .map(|category| (category.name, category.id))
            .collect();
        let mut mapping: HashMap<CategoryId, CategoryId> =
            taken.iter().map(|(_, id)| (*id, *id)).collect();

        for category in categories {
            if mapping.contains_key(&category.id) {
                report.categories_skipped += 1;
                continue;
            }
            let same_name = taken
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&category.name))
                .map(|(_, id)| *id);
            match same_name {
                Some(existing) => {
                    mapping.insert(category.id, existing);
                    report.categories_skipped += 1;
                }
                None => {
                    self.categories.create_category(category)?;
                    mapping.insert(category.id, category.id);
                    taken.push((category.name.clone(), category.id));
                    report.categories_imported += 1;
                }
            }
        }
        Ok(mapping)
    }

    fn project_exists(&self, id: ProjectId) -> RepoResult<bool> {
        Ok(self.projects.get_project(id)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_csv_field, export_tasks, import_json, ExportBundle, ExportError, ExportFormat};
    use crate::model::task::Task;

    #[test]
    fn csv_fields_with_delimiters_are_quoted() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_has_header_and_one_row_per_task() {
        let bundle = ExportBundle::new(0, vec![Task::new("one", 0), Task::new("two", 0)], vec![]);
        let csv = export_tasks(&bundle, ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("id,title,"));
    }

    #[test]
    fn future_versions_are_rejected() {
        let mut bundle = ExportBundle::new(0, vec![], vec![]);
        bundle.format_version = 99;
        let json = serde_json::to_string(&bundle).unwrap();
        assert!(matches!(
            import_json(&json),
            Err(ExportError::UnsupportedVersion(99))
        ));
    }
}
