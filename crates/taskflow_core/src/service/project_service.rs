//! Project and category use-case service.
//!
//! # Responsibility
//! - Normalize user input (trimmed names, lowercase colors) before storage.
//! - Expose archive/restore and progress queries for project pickers.
//!
//! # Invariants
//! - Deleting a project or category never deletes tasks.

use crate::clock::{now_epoch_ms, Clock};
use crate::model::category::{Category, CategoryId};
use crate::model::project::{is_hex_color, Project, ProjectId, ProjectValidationError};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::project_repo::{ProjectRepository, ProjectTaskCounts};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProjectServiceError {
    BlankName,
    InvalidColor(String),
    NotFound(uuid::Uuid),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #RRGGBB"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            RepoError::InvalidProject(ProjectValidationError::BlankName) => Self::BlankName,
            RepoError::InvalidProject(ProjectValidationError::InvalidColor(color)) => {
                Self::InvalidColor(color)
            }
            other => Self::Repo(other),
        }
    }
}

pub type ProjectServiceResult<T> = Result<T, ProjectServiceError>;

/// Project together with its task counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project: Project,
    pub counts: ProjectTaskCounts,
    pub progress: f64,
}

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
    clock: Clock,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    pub fn with_clock(repo: R, clock: Clock) -> Self {
        Self { repo, clock }
    }

    pub fn create_project(
        &self,
        name: &str,
        description: Option<String>,
        color: Option<String>,
    ) -> ProjectServiceResult<Project> {
        let mut project = Project::new(normalize_name(name)?, (self.clock)());
        project.description = description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        project.color = normalize_color(color)?;
        self.repo.create_project(&project)?;
        info!(
            "event=project_create module=service status=ok project_id={}",
            project.id
        );
        Ok(project)
    }

    pub fn update_project(&self, project: Project) -> ProjectServiceResult<Project> {
        let stored = self.require_project(project.id)?;
        let mut updated = project;
        updated.name = normalize_name(&updated.name)?;
        updated.color = normalize_color(updated.color)?;
        updated.created_at = stored.created_at;
        updated.updated_at = (self.clock)();
        self.repo.update_project(&updated)?;
        Ok(updated)
    }

    pub fn set_archived(&self, id: ProjectId, archived: bool) -> ProjectServiceResult<Project> {
        let mut project = self.require_project(id)?;
        if project.is_archived != archived {
            project.is_archived = archived;
            project.updated_at = (self.clock)();
            self.repo.update_project(&project)?;
        }
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> ProjectServiceResult<Option<Project>> {
        Ok(self.repo.get_project(id)?)
    }

    pub fn list_projects(&self, include_archived: bool) -> ProjectServiceResult<Vec<Project>> {
        Ok(self.repo.list_projects(include_archived)?)
    }

    pub fn delete_project(&self, id: ProjectId) -> ProjectServiceResult<()> {
        self.repo.delete_project(id)?;
        info!("event=project_delete module=service status=ok project_id={id}");
        Ok(())
    }

    pub fn summary(&self, id: ProjectId) -> ProjectServiceResult<ProjectSummary> {
        let project = self.require_project(id)?;
        let counts = self.repo.task_counts(id)?;
        Ok(ProjectSummary {
            progress: counts.progress(),
            project,
            counts,
        })
    }

    fn require_project(&self, id: ProjectId) -> ProjectServiceResult<Project> {
        self.repo
            .get_project(id)?
            .ok_or(ProjectServiceError::NotFound(id))
    }
}

pub struct CategoryService<R: CategoryRepository> {
    repo: R,
}

impl<R: CategoryRepository> CategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_category(
        &self,
        name: &str,
        color: Option<String>,
        icon: Option<String>,
    ) -> ProjectServiceResult<Category> {
        let mut category = Category::new(normalize_name(name)?);
        category.color = normalize_color(color)?;
        category.icon = icon.filter(|value| !value.trim().is_empty());
        self.repo.create_category(&category)?;
        Ok(category)
    }

    pub fn update_category(&self, category: Category) -> ProjectServiceResult<Category> {
        let mut updated = category;
        updated.name = normalize_name(&updated.name)?;
        updated.color = normalize_color(updated.color)?;
        self.repo.update_category(&updated)?;
        Ok(updated)
    }

    pub fn list_categories(&self) -> ProjectServiceResult<Vec<Category>> {
        Ok(self.repo.list_categories()?)
    }

    pub fn delete_category(&self, id: CategoryId) -> ProjectServiceResult<()> {
        Ok(self.repo.delete_category(id)?)
    }
}

fn normalize_name(name: &str) -> ProjectServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProjectServiceError::BlankName);
    }
    Ok(trimmed.to_string())
}

/// Trims and lowercases a color; blank input clears it.
fn normalize_color(color: Option<String>) -> ProjectServiceResult<Option<String>> {
    let Some(color) = color else {
        return Ok(None);
    };
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let normalized = trimmed.to_ascii_lowercase();
    if !is_hex_color(&normalized) {
        return Err(ProjectServiceError::InvalidColor(trimmed.to_string()));
    }
    Ok(Some(normalized))
}

#[cfg(test)]
mod tests {
    use super::{normalize_color, ProjectServiceError};

    #[test]
    fn color_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_color(Some(" #A1B2C3 ".to_string())).unwrap(),
            Some("#a1b2c3".to_string())
        );
        assert_eq!(normalize_color(Some("  ".to_string())).unwrap(), None);
        assert!(matches!(
            normalize_color(Some("red".to_string())),
            Err(ProjectServiceError::InvalidColor(_))
        ));
    }
}
