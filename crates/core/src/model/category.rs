use thiserror::Error;

use crate::model::ids::CategoryId;

/// Bucket title for quizzes whose category is missing or was deleted.
pub const UNCATEGORIZED: &str = "Sans catégorie";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category title cannot be empty")]
    EmptyTitle,
}

/// A grouping label shared by quizzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
}

impl Category {
    /// # Errors
    ///
    /// Returns `CategoryError::EmptyTitle` if the title is blank.
    pub fn new(id: CategoryId, title: impl Into<String>) -> Result<Self, CategoryError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(CategoryError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: title.to_owned(),
        })
    }
}

/// Resolves the display bucket for an optional joined category title.
#[must_use]
pub fn bucket_title(title: Option<&str>) -> &str {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => UNCATEGORIZED,
    }
}
