//! Error types shared across the crate.

use serde::Serialize;

/// Persistence failures surfaced by a [`crate::db::Database`] backend.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("identifier space exhausted for {entity}")]
    IdSpaceExhausted { entity: &'static str },

    #[error("invalid seed data: {0}")]
    Seed(String),
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Gateway lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },
}

/// Machine-readable reason attached to a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorCode {
    Required,
    InvalidType,
    InvalidValue,
}

/// One field-level violation found while validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// Payload rejected by schema validation; carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {entity} data: {} field error(s)", errors.len())]
pub struct ValidationError {
    pub entity: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(entity: &'static str, error: FieldError) -> Self {
        Self {
            entity,
            errors: vec![error],
        }
    }

    /// True if any collected error refers to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}
