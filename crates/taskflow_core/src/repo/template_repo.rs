//! Task template repository contracts and SQLite implementation.
//!
//! Tags, checklist titles and the repeat rule are stored as JSON columns;
//! templates are never queried by their contents. A stamped task and the
//! usage bump it causes commit together.

use crate::model::recurrence::RecurrencePattern;
use crate::model::task::{Task, TaskPriority};
use crate::model::template::{TaskTemplate, TemplateId};
use crate::repo::task_repo::insert_task;
use crate::repo::{ensure_tables, parse_uuid, write_atomically, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    title,
    description,
    priority,
    tags_json,
    subtasks_json,
    recurrence_json,
    estimated_minutes,
    usage_count,
    created_at
FROM task_templates";

pub trait TemplateRepository {
    fn create_template(&self, template: &TaskTemplate) -> RepoResult<TemplateId>;
    fn get_template(&self, id: TemplateId) -> RepoResult<Option<TaskTemplate>>;
    /// Lists templates, most used first.
    fn list_templates(&self) -> RepoResult<Vec<TaskTemplate>>;
    fn delete_template(&self, id: TemplateId) -> RepoResult<()>;
    /// Stores `task` stamped from template `id` and counts the use, together.
    fn record_use(&self, id: TemplateId, task: &Task) -> RepoResult<()>;
}

pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["task_templates"])?;
        Ok(Self { conn })
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn create_template(&self, template: &TaskTemplate) -> RepoResult<TemplateId> {
        let recurrence_json = template
            .recurrence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO task_templates (
                uuid,
                name,
                title,
                description,
                priority,
                tags_json,
                subtasks_json,
                recurrence_json,
                estimated_minutes,
                usage_count,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                template.id.to_string(),
                template.name.as_str(),
                template.title.as_str(),
                template.description.as_deref(),
                template.priority.as_str(),
                serde_json::to_string(&template.tags)?,
                serde_json::to_string(&template.subtasks)?,
                recurrence_json,
                template.estimated_minutes,
                template.usage_count,
                template.created_at,
            ],
        )?;
        Ok(template.id)
    }

    fn get_template(&self, id: TemplateId) -> RepoResult<Option<TaskTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_template_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_templates(&self) -> RepoResult<Vec<TaskTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL} ORDER BY usage_count DESC, name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn delete_template(&self, id: TemplateId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_templates WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "template",
                id,
            });
        }
        Ok(())
    }

    fn record_use(&self, id: TemplateId, task: &Task) -> RepoResult<()> {
        write_atomically(self.conn, |conn| {
            insert_task(conn, task)?;
            let changed = conn.execute(
                "UPDATE task_templates SET usage_count = usage_count + 1 WHERE uuid = ?1;",
                [id.to_string()],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "template",
                    id,
                });
            }
            Ok(())
        })
    }
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<TaskTemplate> {
    let uuid_text: String = row.get("uuid")?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in task_templates.priority"
        ))
    })?;
    let tags_json: String = row.get("tags_json")?;
    let subtasks_json: String = row.get("subtasks_json")?;
    let recurrence = match row.get::<_, Option<String>>("recurrence_json")? {
        Some(json) => Some(serde_json::from_str::<RecurrencePattern>(&json)?),
        None => None,
    };

    Ok(TaskTemplate {
        id: parse_uuid(&uuid_text, "task_templates.uuid")?,
        name: row.get("name")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        tags: serde_json::from_str(&tags_json)?,
        subtasks: serde_json::from_str(&subtasks_json)?,
        recurrence,
        estimated_minutes: row.get("estimated_minutes")?,
        usage_count: row.get("usage_count")?,
        created_at: row.get("created_at")?,
    })
}
