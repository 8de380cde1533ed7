//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `tasks` plus its owned rows (subtasks, tag links,
//!   dependency edges).
//! - Persist completion and successor generation in one transaction.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Owned rows are replaced as a whole set together with the task row.
//! - At most one task row references a given `recurrence_source_uuid`.

use crate::model::category::CategoryId;
use crate::model::project::ProjectId;
use crate::model::recurrence::RecurrencePattern;
use crate::model::task::{Subtask, Task, TaskId, TaskPriority, TaskStatus};
use crate::repo::tag_repo::normalize_tags;
use crate::repo::{
    bool_to_int, ensure_tables, parse_bool, parse_optional_uuid, parse_uuid, write_atomically,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    status,
    priority,
    due_at,
    completed_at,
    created_at,
    updated_at,
    project_uuid,
    category_uuid,
    recurrence_parent_uuid,
    recurrence_source_uuid,
    occurrence_index,
    recurrence_json,
    estimated_minutes,
    is_pinned
FROM tasks";

const REQUIRED_TABLES: &[&str] = &["tasks", "subtasks", "tags", "task_tags", "task_dependencies"];

/// Query options for listing tasks. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub statuses: Vec<TaskStatus>,
    pub project_id: Option<ProjectId>,
    pub category_id: Option<CategoryId>,
    /// Exact (case-insensitive) tag match.
    pub tag: Option<String>,
    /// Inclusive lower bound on `due_at`.
    pub due_from: Option<i64>,
    /// Exclusive upper bound on `due_at`.
    pub due_to: Option<i64>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for task operations.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Replaces the full task record, including tags, subtasks and dependencies.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Finds the occurrence generated by completing `source_id`.
    fn find_successor(&self, source_id: TaskId) -> RepoResult<Option<Task>>;
    /// Saves a completed task and inserts `successor` unless one already exists.
    ///
    /// Returns the successor row now stored for `completed`, if any.
    fn save_completion(&self, completed: &Task, successor: Option<&Task>)
        -> RepoResult<Option<Task>>;
    /// Replaces the prerequisite set of one task.
    fn set_dependencies(&self, id: TaskId, dependencies: &[TaskId]) -> RepoResult<()>;
    /// Returns every `(task, prerequisite)` edge.
    fn dependency_edges(&self) -> RepoResult<Vec<(TaskId, TaskId)>>;
    /// Looks up statuses for the given IDs; missing IDs are absent in the map.
    fn task_statuses(&self, ids: &[TaskId]) -> RepoResult<HashMap<TaskId, TaskStatus>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        write_atomically(self.conn, |conn| insert_task(conn, task))?;
        Ok(task.id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        write_atomically(self.conn, |conn| {
            if update_task_row(conn, task)? == 0 {
                return Err(RepoError::NotFound {
                    entity: "task",
                    id: task.id,
                });
            }
            replace_owned_rows(conn, task)
        })
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_task(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.statuses.is_empty() {
            let placeholders = vec!["?"; query.statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
            for status in &query.statuses {
                bind_values.push(Value::Text(status.as_str().to_string()));
            }
        }
        if let Some(project_id) = query.project_id {
            sql.push_str(" AND project_uuid = ?");
            bind_values.push(Value::Text(project_id.to_string()));
        }
        if let Some(category_id) = query.category_id {
            sql.push_str(" AND category_uuid = ?");
            bind_values.push(Value::Text(category_id.to_string()));
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM task_tags tt
                    INNER JOIN tags t ON t.id = tt.tag_id
                    WHERE tt.task_uuid = tasks.uuid
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.trim().to_lowercase()));
        }
        if let Some(due_from) = query.due_from {
            sql.push_str(" AND due_at >= ?");
            bind_values.push(Value::Integer(due_from));
        }
        if let Some(due_to) = query.due_to {
            sql.push_str(" AND due_at < ?");
            bind_values.push(Value::Integer(due_to));
        }

        sql.push_str(" ORDER BY created_at ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(load_task(self.conn, row)?);
        }
        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "task", id });
        }
        Ok(())
    }

    fn find_successor(&self, source_id: TaskId) -> RepoResult<Option<Task>> {
        find_successor_in(self.conn, source_id)
    }

    fn save_completion(
        &self,
        completed: &Task,
        successor: Option<&Task>,
    ) -> RepoResult<Option<Task>> {
        completed.validate()?;
        if let Some(successor) = successor {
            successor.validate()?;
        }

        write_atomically(self.conn, |conn| {
            if update_task_row(conn, completed)? == 0 {
                return Err(RepoError::NotFound {
                    entity: "task",
                    id: completed.id,
                });
            }
            replace_owned_rows(conn, completed)?;

            match find_successor_in(conn, completed.id)? {
                Some(existing) => Ok(Some(existing)),
                None => match successor {
                    Some(successor) => {
                        insert_task_row(conn, successor)?;
                        replace_owned_rows(conn, successor)?;
                        Ok(Some(successor.clone()))
                    }
                    None => Ok(None),
                },
            }
        })
    }

    fn set_dependencies(&self, id: TaskId, dependencies: &[TaskId]) -> RepoResult<()> {
        write_atomically(self.conn, |conn| {
            if !task_exists(conn, id)? {
                return Err(RepoError::NotFound { entity: "task", id });
            }
            write_dependencies(conn, id, dependencies)
        })
    }

    fn dependency_edges(&self) -> RepoResult<Vec<(TaskId, TaskId)>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_uuid, depends_on_uuid
             FROM task_dependencies
             ORDER BY task_uuid ASC, depends_on_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            let task: String = row.get(0)?;
            let prerequisite: String = row.get(1)?;
            edges.push((
                parse_uuid(&task, "task_dependencies.task_uuid")?,
                parse_uuid(&prerequisite, "task_dependencies.depends_on_uuid")?,
            ));
        }
        Ok(edges)
    }

    fn task_statuses(&self, ids: &[TaskId]) -> RepoResult<HashMap<TaskId, TaskStatus>> {
        let mut statuses = HashMap::with_capacity(ids.len());
        let mut stmt = self
            .conn
            .prepare("SELECT status FROM tasks WHERE uuid = ?1;")?;
        for id in ids {
            let status: Option<String> = stmt
                .query_row([id.to_string()], |row| row.get(0))
                .optional()?;
            if let Some(status) = status {
                statuses.insert(*id, parse_status(&status)?);
            }
        }
        Ok(statuses)
    }
}

/// Validates `task` and writes its row plus owned rows on `conn`.
///
/// Callers wrap this in [`write_atomically`].
pub(crate) fn insert_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    task.validate()?;
    insert_task_row(conn, task)?;
    replace_owned_rows(conn, task)
}

fn insert_task_row(conn: &Connection, task: &Task) -> RepoResult<()> {
    let recurrence_json = recurrence_to_json(task.recurrence.as_ref())?;
    conn.execute(
        "INSERT INTO tasks (
            uuid,
            title,
            description,
            status,
            priority,
            due_at,
            completed_at,
            created_at,
            updated_at,
            project_uuid,
            category_uuid,
            recurrence_parent_uuid,
            recurrence_source_uuid,
            occurrence_index,
            recurrence_json,
            estimated_minutes,
            is_pinned
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17);",
        params![
            task.id.to_string(),
            task.title.as_str(),
            task.description.as_deref(),
            task.status.as_str(),
            task.priority.as_str(),
            task.due_at,
            task.completed_at,
            task.created_at,
            task.updated_at,
            task.project_id.map(|id| id.to_string()),
            task.category_id.map(|id| id.to_string()),
            task.recurrence_parent_id.map(|id| id.to_string()),
            task.recurrence_source_id.map(|id| id.to_string()),
            task.occurrence_index,
            recurrence_json,
            task.estimated_minutes,
            bool_to_int(task.is_pinned),
        ],
    )?;
    Ok(())
}

fn update_task_row(conn: &Connection, task: &Task) -> RepoResult<usize> {
    let recurrence_json = recurrence_to_json(task.recurrence.as_ref())?;
    let changed = conn.execute(
        "UPDATE tasks
         SET
            title = ?2,
            description = ?3,
            status = ?4,
            priority = ?5,
            due_at = ?6,
            completed_at = ?7,
            updated_at = ?8,
            project_uuid = ?9,
            category_uuid = ?10,
            recurrence_parent_uuid = ?11,
            recurrence_source_uuid = ?12,
            occurrence_index = ?13,
            recurrence_json = ?14,
            estimated_minutes = ?15,
            is_pinned = ?16
         WHERE uuid = ?1;",
        params![
            task.id.to_string(),
            task.title.as_str(),
            task.description.as_deref(),
            task.status.as_str(),
            task.priority.as_str(),
            task.due_at,
            task.completed_at,
            task.updated_at,
            task.project_id.map(|id| id.to_string()),
            task.category_id.map(|id| id.to_string()),
            task.recurrence_parent_id.map(|id| id.to_string()),
            task.recurrence_source_id.map(|id| id.to_string()),
            task.occurrence_index,
            recurrence_json,
            task.estimated_minutes,
            bool_to_int(task.is_pinned),
        ],
    )?;
    Ok(changed)
}

fn replace_owned_rows(conn: &Connection, task: &Task) -> RepoResult<()> {
    let task_uuid = task.id.to_string();

    conn.execute(
        "DELETE FROM subtasks WHERE task_uuid = ?1;",
        [task_uuid.as_str()],
    )?;
    for subtask in &task.subtasks {
        conn.execute(
            "INSERT INTO subtasks (uuid, task_uuid, title, is_completed, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                subtask.id.to_string(),
                task_uuid.as_str(),
                subtask.title.as_str(),
                bool_to_int(subtask.is_completed),
                subtask.position,
            ],
        )?;
    }

    conn.execute(
        "DELETE FROM task_tags WHERE task_uuid = ?1;",
        [task_uuid.as_str()],
    )?;
    for tag in normalize_tags(&task.tags) {
        conn.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1);",
            [tag.as_str()],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO task_tags (task_uuid, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![task_uuid.as_str(), tag.as_str()],
        )?;
    }

    write_dependencies(conn, task.id, &task.dependencies)
}

fn write_dependencies(conn: &Connection, id: TaskId, dependencies: &[TaskId]) -> RepoResult<()> {
    let task_uuid = id.to_string();
    conn.execute(
        "DELETE FROM task_dependencies WHERE task_uuid = ?1;",
        [task_uuid.as_str()],
    )?;
    for dependency in dependencies {
        conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_uuid, depends_on_uuid)
             VALUES (?1, ?2);",
            params![task_uuid.as_str(), dependency.to_string()],
        )?;
    }
    Ok(())
}

fn task_exists(conn: &Connection, id: TaskId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn find_successor_in(conn: &Connection, source_id: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL} WHERE recurrence_source_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([source_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(load_task(conn, row)?)),
        None => Ok(None),
    }
}

fn load_task(conn: &Connection, row: &Row<'_>) -> RepoResult<Task> {
    let mut task = parse_task_row(row)?;
    let task_uuid = task.id.to_string();
    task.tags = load_tags(conn, &task_uuid)?;
    task.subtasks = load_subtasks(conn, &task_uuid)?;
    task.dependencies = load_dependencies(conn, &task_uuid)?;
    task.validate()?;
    Ok(task)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let status_text: String = row.get("status")?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;
    let recurrence = match row.get::<_, Option<String>>("recurrence_json")? {
        Some(json) => Some(serde_json::from_str::<RecurrencePattern>(&json)?),
        None => None,
    };

    Ok(Task {
        id: parse_uuid(&uuid_text, "tasks.uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: parse_status(&status_text)?,
        priority,
        due_at: row.get("due_at")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        project_id: parse_optional_uuid(row.get("project_uuid")?, "tasks.project_uuid")?,
        category_id: parse_optional_uuid(row.get("category_uuid")?, "tasks.category_uuid")?,
        recurrence_parent_id: parse_optional_uuid(
            row.get("recurrence_parent_uuid")?,
            "tasks.recurrence_parent_uuid",
        )?,
        recurrence_source_id: parse_optional_uuid(
            row.get("recurrence_source_uuid")?,
            "tasks.recurrence_source_uuid",
        )?,
        occurrence_index: row.get("occurrence_index")?,
        recurrence,
        tags: Vec::new(),
        subtasks: Vec::new(),
        dependencies: Vec::new(),
        estimated_minutes: row.get("estimated_minutes")?,
        is_pinned: parse_bool(row.get("is_pinned")?, "tasks.is_pinned")?,
    })
}

fn parse_status(value: &str) -> RepoResult<TaskStatus> {
    TaskStatus::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{value}` in tasks.status"))
    })
}

fn load_tags(conn: &Connection, task_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM task_tags tt
         INNER JOIN tags t ON t.id = tt.tag_id
         WHERE tt.task_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([task_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn load_subtasks(conn: &Connection, task_uuid: &str) -> RepoResult<Vec<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, title, is_completed, position
         FROM subtasks
         WHERE task_uuid = ?1
         ORDER BY position ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([task_uuid])?;
    let mut subtasks = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        subtasks.push(Subtask {
            id: parse_uuid(&uuid_text, "subtasks.uuid")?,
            title: row.get("title")?,
            is_completed: parse_bool(row.get("is_completed")?, "subtasks.is_completed")?,
            position: row.get("position")?,
        });
    }
    Ok(subtasks)
}

fn load_dependencies(conn: &Connection, task_uuid: &str) -> RepoResult<Vec<TaskId>> {
    let mut stmt = conn.prepare(
        "SELECT depends_on_uuid
         FROM task_dependencies
         WHERE task_uuid = ?1
         ORDER BY depends_on_uuid ASC;",
    )?;
    let mut rows = stmt.query([task_uuid])?;
    let mut dependencies = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        dependencies.push(parse_uuid(&value, "task_dependencies.depends_on_uuid")?);
    }
    Ok(dependencies)
}

fn recurrence_to_json(pattern: Option<&RecurrencePattern>) -> RepoResult<Option<String>> {
    pattern
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}
