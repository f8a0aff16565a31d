//! Error types for the Formwork engine.

use crate::{FieldName, SchemaVersion};
use thiserror::Error;

/// All possible errors from the Formwork engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Schema errors
    #[error("duplicate field name: {0}")]
    DuplicateField(FieldName),

    #[error("condition cycle: {}", .0.join(" -> "))]
    ConditionCycle(Vec<FieldName>),

    #[error("invalid pattern for field '{field}': {reason}")]
    InvalidPattern { field: FieldName, reason: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    // Value errors
    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("field not found: {0}")]
    FieldNotFound(FieldName),

    // Draft errors
    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    #[error("schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch {
        expected: SchemaVersion,
        actual: SchemaVersion,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
