//! Core error types for BizDev CRM RS
//!
//! Every fallible operation in the engagement subsystem resolves to one of
//! these kinds; nothing is swallowed on the way to the caller.

use std::collections::HashMap;
use thiserror::Error;

/// Core error type for all CRM operations
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid state: {message}")]
    State { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrmError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        CrmError::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CrmError::Conflict {
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        CrmError::State {
            message: message.into(),
        }
    }
}

/// Validation errors collection, keyed by field
#[derive(Error, Debug, Default, Clone)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record an error against a specific import row. Bulk CSV failures are
    /// always reported with the offending row index.
    pub fn add_row(&mut self, row_index: usize, field: &str, message: impl Into<String>) {
        self.add(format!("rows[{}].{}", row_index, field), message);
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        let mut fields: Vec<_> = self.errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, field_messages) in fields {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }
}

/// HTTP status code mapping for errors
impl CrmError {
    pub fn status_code(&self) -> u16 {
        match self {
            CrmError::NotFound { .. } => 404,
            CrmError::Validation(_) => 422,
            CrmError::Conflict { .. } => 409,
            CrmError::State { .. } => 422,
            CrmError::Database(_) | CrmError::Internal(_) | CrmError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CrmError::NotFound { .. } => "not_found",
            CrmError::Validation(_) => "validation_failed",
            CrmError::Conflict { .. } => "conflict",
            CrmError::State { .. } => "invalid_state",
            CrmError::Database(_) => "database_error",
            CrmError::Internal(_) => "internal_error",
            CrmError::Config(_) => "configuration_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_errors_carry_index() {
        let mut errors = ValidationErrors::new();
        errors.add_row(3, "phaseName", "is required");
        assert!(errors.has_error("rows[3].phaseName"));
        assert_eq!(
            errors.full_messages(),
            vec!["rows[3].phaseName is required".to_string()]
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            CrmError::not_found("WorkPackage", "id", 7).error_code(),
            "not_found"
        );
        assert_eq!(CrmError::conflict("label clash").status_code(), 409);
        assert_eq!(CrmError::state("no anchor").status_code(), 422);
        assert_eq!(
            CrmError::Validation(ValidationErrors::new()).error_code(),
            "validation_failed"
        );
    }

    #[test]
    fn test_merge_keeps_both_sides() {
        let mut a = ValidationErrors::new();
        a.add("title", "is required");
        let mut b = ValidationErrors::new();
        b.add("title", "is too short");
        b.add_base("tree is empty");
        a.merge(b);
        assert_eq!(a.get("title").map(Vec::len), Some(2));
        assert_eq!(a.base_errors.len(), 1);
    }
}
