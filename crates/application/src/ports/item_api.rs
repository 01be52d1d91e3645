//! Resource API port

use async_trait::async_trait;
use thiserror::Error;
use warden_domain::{Credential, Item, ItemDraft, ItemId};

/// Errors reported by the resource API adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiCallError {
    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for display.
        body: String,
    },

    /// The API did not answer in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The API could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered 2xx with a body that does not match the item schema.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiCallError {
    /// Returns true if the API rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// Port for the remote item collection.
///
/// Every call carries the credential whose access token is sent as the
/// `Authorization` header.
#[async_trait]
pub trait ItemApi: Send + Sync {
    /// `GET /items/`
    async fn list(&self, credential: &Credential) -> Result<Vec<Item>, ApiCallError>;

    /// `GET /items/{id}`
    async fn get(&self, credential: &Credential, id: &ItemId) -> Result<Item, ApiCallError>;

    /// `POST /items/`
    async fn create(&self, credential: &Credential, draft: &ItemDraft)
    -> Result<(), ApiCallError>;

    /// `PUT /items/{id}`
    async fn update(
        &self,
        credential: &Credential,
        id: &ItemId,
        draft: &ItemDraft,
    ) -> Result<(), ApiCallError>;

    /// `DELETE /items/{id}`
    async fn delete(&self, credential: &Credential, id: &ItemId) -> Result<(), ApiCallError>;
}
