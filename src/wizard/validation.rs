//! Step and assembly validation failures

use miette::Diagnostic;
use thiserror::Error;

/// A missing or invalid field; always recoverable by correcting the input
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{field}: {reason}")]
#[diagnostic(code(doorway::wizard::validation))]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field is required but absent
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}
