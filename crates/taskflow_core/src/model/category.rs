//! Category domain model.
//!
//! Categories are a flat, user-defined classification (work, health, ...)
//! orthogonal to projects. Names are unique ignoring case.

use crate::model::project::is_hex_color;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CategoryId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    NilId,
    BlankName,
    InvalidColor(String),
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "category id must not be nil"),
            Self::BlankName => write!(f, "category name must not be blank"),
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #RRGGBB"),
        }
    }
}

impl Error for CategoryValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// `#RRGGBB` color literal.
    pub color: Option<String>,
    /// Icon key resolved by the UI layer.
    pub icon: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: None,
            icon: None,
        }
    }

    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.id.is_nil() {
            return Err(CategoryValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::BlankName);
        }
        if let Some(color) = self.color.as_deref() {
            if !is_hex_color(color) {
                return Err(CategoryValidationError::InvalidColor(color.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryValidationError};
    use uuid::Uuid;

    #[test]
    fn validate_rejects_nil_blank_and_bad_color() {
        assert_eq!(Category::new("Work").validate(), Ok(()));

        let mut nil = Category::new("Work");
        nil.id = Uuid::nil();
        assert_eq!(nil.validate(), Err(CategoryValidationError::NilId));

        assert_eq!(
            Category::new("  ").validate(),
            Err(CategoryValidationError::BlankName)
        );

        let mut tinted = Category::new("Work");
        tinted.color = Some("teal".to_string());
        assert_eq!(
            tinted.validate(),
            Err(CategoryValidationError::InvalidColor("teal".to_string()))
        );
    }
}
