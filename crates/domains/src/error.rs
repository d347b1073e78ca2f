//! Centralized error taxonomy for the chess-club backend.
//!
//! Every service operation and port implementation reports failures through
//! [`DomainError`]; the HTTP layer maps each variant to a fixed status family.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed or out-of-range input, with field-level detail.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Missing, expired, or otherwise unusable credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource or sub-resource absent. Carries the resource noun so the
    /// HTTP layer can render "Post not found" etc.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Image-store or persistence-store call failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl DomainError {
    /// Creates a validation error for a named field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates an upstream failure from any displayable source.
    pub fn upstream(source: impl ToString) -> Self {
        Self::Upstream(source.to_string())
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
