//! Error types for loading and mutating narrative state.

use thiserror::Error;

use crate::units::UnitStatus;

/// Errors raised by the state layer.
#[derive(Debug, Error)]
pub enum StateError {
    /// The project document is missing a required collection or holds an
    /// out-of-range value.
    #[error("Invalid project: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unit {number} cannot move from {from} to {to}")]
    InvalidTransition {
        number: u32,
        from: UnitStatus,
        to: UnitStatus,
    },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

impl StateError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StateError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;
