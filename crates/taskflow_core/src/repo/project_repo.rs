//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Deleting a project detaches its tasks (`project_uuid = NULL`) instead of
//!   deleting them.
//! - Lists are ordered by `name COLLATE NOCASE, uuid`.

use crate::model::project::{Project, ProjectId};
use crate::repo::{bool_to_int, ensure_tables, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    color,
    is_archived,
    created_at,
    updated_at
FROM projects";

/// Task counts for one project, keyed by status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectTaskCounts {
    pub total: u32,
    pub open: u32,
    pub completed: u32,
}

impl ProjectTaskCounts {
    /// Completed share in `0.0..=1.0`; empty projects report `0.0`.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.completed) / f64::from(self.total)
        }
    }
}

pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects(&self, include_archived: bool) -> RepoResult<Vec<Project>>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn task_counts(&self, id: ProjectId) -> RepoResult<ProjectTaskCounts>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["projects", "tasks"])?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;
        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                name,
                description,
                color,
                is_archived,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_deref(),
                project.color.as_deref(),
                bool_to_int(project.is_archived),
                project.created_at,
                project.updated_at,
            ],
        )?;
        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?2,
                description = ?3,
                color = ?4,
                is_archived = ?5,
                updated_at = ?6
             WHERE uuid = ?1;",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_deref(),
                project.color.as_deref(),
                bool_to_int(project.is_archived),
                project.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_project_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_projects(&self, include_archived: bool) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE (?1 = 1 OR is_archived = 0)
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_archived)])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        Ok(())
    }

    fn task_counts(&self, id: ProjectId) -> RepoResult<ProjectTaskCounts> {
        let counts = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status IN ('pending', 'in_progress') THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
             FROM tasks
             WHERE project_uuid = ?1;",
            [id.to_string()],
            |row| {
                Ok(ProjectTaskCounts {
                    total: row.get(0)?,
                    open: row.get(1)?,
                    completed: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let project = Project {
        id: parse_uuid(&uuid_text, "projects.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        color: row.get("color")?,
        is_archived: parse_bool(row.get("is_archived")?, "projects.is_archived")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    project
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("project {}: {err}", project.id)))?;
    Ok(project)
}
