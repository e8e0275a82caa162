use crate::errors::ReproError;
use crate::models::Category;
use super::validate::check_markers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Unchecked,
    Validated,
}

/// Plan text produced by the generative backend for one attempt.
///
/// Only `validate` can move a script to `Validated`, and the sandbox refuses
/// anything else.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    text: String,
    category: Category,
    attempt_index: u32,
    status: ValidationStatus,
}

impl GeneratedScript {
    pub fn new(text: impl Into<String>, category: Category, attempt_index: u32) -> Self {
        Self {
            text: text.into(),
            category,
            attempt_index,
            status: ValidationStatus::Unchecked,
        }
    }

    pub fn validate(mut self) -> Result<Self, ReproError> {
        check_markers(&self.text)?;
        self.status = ValidationStatus::Validated;
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn attempt_index(&self) -> u32 {
        self.attempt_index
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn is_validated(&self) -> bool {
        self.status == ValidationStatus::Validated
    }
}
