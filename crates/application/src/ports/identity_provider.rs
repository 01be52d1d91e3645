//! Identity provider port
//!
//! Abstracts the external OIDC authorization server: building the
//! authorization redirect, exchanging the callback code for a credential,
//! and ending the provider-side session.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;
use warden_domain::Credential;

/// Parameters generated for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Opaque value the provider echoes back on the callback.
    pub state: String,
    /// Value the provider embeds in the ID token.
    pub nonce: String,
    /// PKCE S256 challenge derived from the code verifier.
    pub code_challenge: String,
}

/// Errors reported by the identity provider adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with an OAuth2 error.
    #[error("provider rejected the request: {}", .description.as_deref().unwrap_or(.error))]
    Rejected {
        /// OAuth2 error code.
        error: String,
        /// Human-readable description, if any.
        description: Option<String>,
    },

    /// The provider did not answer in time.
    #[error("provider request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with something that is not a valid token response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Endpoints or client settings are unusable.
    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

/// Port for the OIDC authorization server.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the authorization endpoint URL the browser is redirected to.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if the endpoint is unusable.
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url, ProviderError>;

    /// Exchanges an authorization code for a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the code or cannot be reached.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Credential, ProviderError>;

    /// Revokes the credential's access token at the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the revocation or cannot be reached.
    async fn revoke(&self, credential: &Credential) -> Result<(), ProviderError>;

    /// URL that ends the provider-side session, if sign-out should redirect there.
    fn end_session_url(&self, id_token_hint: Option<&str>) -> Option<Url>;
}
