//! Application error types
//!
//! `AuthExchangeError` and `ResourceError` are the failure kinds surfaced
//! to views.

use thiserror::Error;
use warden_domain::DomainError;

use crate::ports::{ApiCallError, ProviderError};

/// The authorization callback could not be turned into a credential.
///
/// Never retried: the session is forced back to `Unauthenticated`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthExchangeError {
    /// The callback URI carried no usable authorization response.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// The provider reported an error on the callback.
    #[error("authorization denied: {}", .description.as_deref().unwrap_or(.error))]
    ProviderDenied {
        /// OAuth2 error code.
        error: String,
        /// Human-readable description, if any.
        description: Option<String>,
    },

    /// No sign-in was started, or its callback was already consumed.
    #[error("no pending authorization for this callback")]
    NoPendingAuthorization,

    /// The callback state does not match the pending authorization.
    #[error("authorization state mismatch")]
    StateMismatch,

    /// The ID token nonce does not match the pending authorization.
    #[error("ID token nonce mismatch")]
    NonceMismatch,

    /// The token endpoint refused the code or returned an unusable credential.
    #[error("code exchange rejected: {0}")]
    ExchangeRejected(String),

    /// A sign-out happened while the code was being exchanged.
    #[error("sign-in cancelled by sign-out")]
    Cancelled,

    /// The token endpoint could not be reached.
    #[error("code exchange failed: {0}")]
    Transport(String),
}

impl From<ProviderError> for AuthExchangeError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Rejected { error, description } => {
                Self::ExchangeRejected(description.unwrap_or(error))
            }
            ProviderError::InvalidResponse(message) | ProviderError::Configuration(message) => {
                Self::ExchangeRejected(message)
            }
            ProviderError::Timeout { .. } | ProviderError::Network(_) => {
                Self::Transport(error.to_string())
            }
        }
    }
}

/// Errors from session lifecycle operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The callback exchange failed.
    #[error(transparent)]
    AuthExchange(#[from] AuthExchangeError),

    /// The provider could not complete a sign-in or sign-out step.
    #[error("identity provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors from resource API operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// No valid credential, or the API answered 401.
    #[error("not signed in")]
    Unauthorized,

    /// The API answered with a non-2xx status or a malformed body.
    #[error("{}", api_message(.status, .message))]
    Api {
        /// HTTP status, absent for malformed 2xx bodies.
        status: Option<u16>,
        /// Display message.
        message: String,
    },

    /// The API did not answer in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The API could not be reached.
    #[error("network error: {0}")]
    Transport(String),

    /// The draft was rejected before any request was sent.
    #[error(transparent)]
    InvalidDraft(#[from] DomainError),
}

fn api_message(status: &Option<u16>, message: &str) -> String {
    status.map_or_else(|| message.to_string(), |s| format!("HTTP {s}: {message}"))
}

impl ResourceError {
    /// Returns true if the caller must go back through sign-in.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<ApiCallError> for ResourceError {
    fn from(error: ApiCallError) -> Self {
        match error {
            ApiCallError::Status { status: 401, .. } => Self::Unauthorized,
            ApiCallError::Status { status, body } => Self::Api {
                status: Some(status),
                message: body,
            },
            ApiCallError::Malformed(message) => Self::Api {
                status: None,
                message: format!("malformed response: {message}"),
            },
            ApiCallError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            ApiCallError::Transport(message) => Self::Transport(message),
        }
    }
}
