//! OIDC authorization code flow against the provider's endpoints.
//!
//! Implements the `IdentityProvider` port: builds the PKCE authorization
//! redirect, exchanges the callback code at the token endpoint, revokes
//! tokens (RFC 7009) and builds the end-session redirect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use warden_application::ports::{AuthorizationRequest, Clock, IdentityProvider, ProviderError};
use warden_domain::{Credential, DomainError, OidcConfig};

use super::id_token::decode_claims;

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// `OAuth2` token response from token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// `OAuth2` error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Identity provider adapter for an OIDC authorization server.
pub struct OidcProvider {
    config: OidcConfig,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    authorization_url: Url,
    token_url: Url,
    revocation_url: Url,
    end_session_url: Url,
    timeout_ms: u64,
}

impl OidcProvider {
    /// Creates a provider for `config`; each call is bounded by `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if an endpoint URL is unusable.
    pub fn new(
        config: &OidcConfig,
        clock: Arc<dyn Clock>,
        timeout_ms: u64,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            authorization_url: config.authorization_url().map_err(configuration)?,
            token_url: config.token_url().map_err(configuration)?,
            revocation_url: config.revocation_url().map_err(configuration)?,
            end_session_url: config.end_session_url().map_err(configuration)?,
            config: config.clone(),
            http_client,
            clock,
            timeout_ms,
        })
    }

    /// Posts a form to `url` and returns the successful response.
    async fn post_form(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ProviderError> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to encode form: {e}")))?;

        let response = self
            .http_client
            .post(url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.timeout_ms))
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_error(&e))?;

        let status = response.status();
        debug!(status = status.as_u16(), endpoint = %url, "provider responded");
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        if let Ok(error_response) = serde_json::from_str::<TokenErrorResponse>(&error_text) {
            return Err(ProviderError::Rejected {
                error: error_response.error,
                description: error_response.error_description,
            });
        }
        Err(ProviderError::InvalidResponse(format!(
            "HTTP {}: {}",
            status.as_u16(),
            error_text.trim()
        )))
    }

    fn map_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                timeout_ms: self.timeout_ms,
            };
        }
        ProviderError::Network(error.to_string())
    }

    fn credential_from(&self, token_response: TokenResponse) -> Result<Credential, ProviderError> {
        if token_response.access_token.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        let scopes: Vec<String> = token_response.scope.map_or_else(
            || self.config.scopes.clone(),
            |s| s.split_whitespace().map(String::from).collect(),
        );

        let mut credential = Credential::new(
            token_response.access_token,
            token_response.token_type,
            token_response.expires_in,
            self.clock.now(),
        )
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
        .with_scopes(scopes);

        if let Some(id_token) = token_response.id_token {
            let claims = decode_claims(&id_token)?;
            credential = credential.with_identity(id_token, Some(claims));
        }
        Ok(credential)
    }
}

fn configuration(error: DomainError) -> ProviderError {
    ProviderError::Configuration(error.to_string())
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url, ProviderError> {
        let mut url = self.authorization_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope_param())
            .append_pair("state", &request.state)
            .append_pair("nonce", &request.nonce)
            .append_pair("code_challenge", &request.code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Credential, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
        ];

        let response = self.post_form(&self.token_url, &params).await?;
        let token_response: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse token response: {e}"))
        })?;

        let credential = self.credential_from(token_response)?;
        info!(
            token = %credential.token_preview(),
            expires_at = ?credential.expires_at,
            "authorization code exchanged"
        );
        Ok(credential)
    }

    async fn revoke(&self, credential: &Credential) -> Result<(), ProviderError> {
        let params = [
            ("token", credential.access_token.as_str()),
            ("token_type_hint", "access_token"),
            ("client_id", self.config.client_id.as_str()),
        ];

        self.post_form(&self.revocation_url, &params).await?;
        debug!(token = %credential.token_preview(), "token revoked");
        Ok(())
    }

    fn end_session_url(&self, id_token_hint: Option<&str>) -> Option<Url> {
        let post_logout = self.config.post_logout_redirect_uri.as_deref()?;

        let mut url = self.end_session_url.clone();
        {
            let mut query = url.query_pairs_mut();
            match id_token_hint {
                Some(hint) => query.append_pair("id_token_hint", hint),
                None => query.append_pair("client_id", &self.config.client_id),
            };
            query.append_pair("post_logout_redirect_uri", post_logout);
        }
        Some(url)
    }
}
