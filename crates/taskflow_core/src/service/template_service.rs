//! Task template use-case service.
//!
//! # Responsibility
//! - Manage the template gallery.
//! - Stamp new tasks out of templates and track how often each is used.

use crate::clock::{now_epoch_ms, Clock};
use crate::model::recurrence::RecurrenceValidationError;
use crate::model::task::Task;
use crate::model::template::{TaskTemplate, TemplateId};
use crate::repo::tag_repo::normalize_tags;
use crate::repo::template_repo::TemplateRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum TemplateServiceError {
    BlankName,
    BlankTitle,
    InvalidRecurrence(RecurrenceValidationError),
    TemplateNotFound(TemplateId),
    Repo(RepoError),
}

impl Display for TemplateServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "template name must not be blank"),
            Self::BlankTitle => write!(f, "template task title must not be blank"),
            Self::InvalidRecurrence(err) => write!(f, "{err}"),
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TemplateServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRecurrence(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TemplateServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "template",
                id,
            } => Self::TemplateNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type TemplateServiceResult<T> = Result<T, TemplateServiceError>;

pub struct TemplateService<T: TemplateRepository> {
    templates: T,
    clock: Clock,
}

impl<T: TemplateRepository> TemplateService<T> {
    pub fn new(templates: T) -> Self {
        Self::with_clock(templates, now_epoch_ms)
    }

    pub fn with_clock(templates: T, clock: Clock) -> Self {
        Self { templates, clock }
    }

    pub fn create_template(&self, template: TaskTemplate) -> TemplateServiceResult<TaskTemplate> {
        let mut template = template;
        template.name = template.name.trim().to_string();
        template.title = template.title.trim().to_string();
        if template.name.is_empty() {
            return Err(TemplateServiceError::BlankName);
        }
        if template.title.is_empty() {
            return Err(TemplateServiceError::BlankTitle);
        }
        if let Some(pattern) = template.recurrence.as_ref() {
            pattern
                .validate()
                .map_err(TemplateServiceError::InvalidRecurrence)?;
        }
        template.tags = normalize_tags(&template.tags);
        template.subtasks = template
            .subtasks
            .into_iter()
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .collect();
        template.usage_count = 0;
        template.created_at = (self.clock)();

        self.templates.create_template(&template)?;
        Ok(template)
    }

    pub fn get_template(&self, id: TemplateId) -> TemplateServiceResult<Option<TaskTemplate>> {
        Ok(self.templates.get_template(id)?)
    }

    pub fn list_templates(&self) -> TemplateServiceResult<Vec<TaskTemplate>> {
        Ok(self.templates.list_templates()?)
    }

    pub fn delete_template(&self, id: TemplateId) -> TemplateServiceResult<()> {
        Ok(self.templates.delete_template(id)?)
    }

    /// Creates a pending task from a template and bumps its usage count.
    ///
    /// Either both writes land or neither does.
    pub fn create_task_from_template(
        &self,
        id: TemplateId,
        due_at: Option<i64>,
    ) -> TemplateServiceResult<Task> {
        let template = self
            .templates
            .get_template(id)?
            .ok_or(TemplateServiceError::TemplateNotFound(id))?;
        let task = template.instantiate((self.clock)(), due_at);
        self.templates.record_use(id, &task)?;
        info!(
            "event=template_use module=service status=ok template_id={id} task_id={}",
            task.id
        );
        Ok(task)
    }
}
