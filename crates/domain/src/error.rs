//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A configuration value is missing or unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An item draft does not satisfy the item schema.
    #[error("invalid item draft: {0}")]
    InvalidDraft(String),

    /// A credential's lifetime cannot be represented.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// An authorization callback URI could not be interpreted.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
