//! Project domain model.
//!
//! # Invariants
//! - `name` is non-blank after trim.
//! - `color`, when set, is a `#RRGGBB` hex string.
//! - Archived projects keep their tasks; archiving only hides them from pickers.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ProjectId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    NilId,
    BlankName,
    InvalidColor(String),
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "project id must not be nil"),
            Self::BlankName => write!(f, "project name must not be blank"),
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #RRGGBB"),
        }
    }
}

impl Error for ProjectValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            color: None,
            is_archived: false,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.id.is_nil() {
            return Err(ProjectValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(ProjectValidationError::BlankName);
        }
        if let Some(color) = self.color.as_deref() {
            if !is_hex_color(color) {
                return Err(ProjectValidationError::InvalidColor(color.to_string()));
            }
        }
        Ok(())
    }
}

/// Returns whether `value` is a `#RRGGBB` color literal.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
