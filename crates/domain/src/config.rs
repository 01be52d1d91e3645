//! Client configuration model.
//!
//! Holds the identity provider and resource API settings fixed at startup.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Default scopes requested at sign-in.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Default resource API collection URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/items/";

/// Default timeout for provider and API calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Authorization server issuer, e.g. `https://example.okta.com/oauth2/default`.
    pub issuer: String,
    /// Public client identifier.
    pub client_id: String,
    /// Where the provider sends the browser back, e.g. `http://localhost:3000/login/callback`.
    pub redirect_uri: String,
    /// Scopes requested at sign-in.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Where the provider sends the browser after sign-out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,
    /// Overrides `{issuer}/v1/authorize`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    /// Overrides `{issuer}/v1/token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    /// Overrides `{issuer}/v1/revoke`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,
    /// Overrides `{issuer}/v1/logout`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(ToString::to_string).collect()
}

impl OidcConfig {
    /// Creates a config with default scopes and derived endpoints.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            post_logout_redirect_uri: None,
            authorization_endpoint: None,
            token_endpoint: None,
            revocation_endpoint: None,
            end_session_endpoint: None,
        }
    }

    /// Authorization endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn authorization_url(&self) -> DomainResult<Url> {
        self.endpoint(self.authorization_endpoint.as_deref(), "authorize")
    }

    /// Token endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn token_url(&self) -> DomainResult<Url> {
        self.endpoint(self.token_endpoint.as_deref(), "token")
    }

    /// Revocation endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn revocation_url(&self) -> DomainResult<Url> {
        self.endpoint(self.revocation_endpoint.as_deref(), "revoke")
    }

    /// End-session endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn end_session_url(&self) -> DomainResult<Url> {
        self.endpoint(self.end_session_endpoint.as_deref(), "logout")
    }

    /// Parsed redirect URI.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn redirect_url(&self) -> DomainResult<Url> {
        parse_url(&self.redirect_uri)
    }

    /// Origin of the application, taken from the redirect URI.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the redirect URI cannot be parsed.
    pub fn app_origin(&self) -> DomainResult<Url> {
        let origin = self.redirect_url()?.origin().ascii_serialization();
        parse_url(&origin)
    }

    /// Key under which this client's credential is stored.
    #[must_use]
    pub fn session_key(&self) -> String {
        format!("oidc:{}:{}", self.issuer.trim_end_matches('/'), self.client_id)
    }

    /// Space-separated scope parameter.
    #[must_use]
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    fn endpoint(&self, configured: Option<&str>, suffix: &str) -> DomainResult<Url> {
        configured.map_or_else(
            || parse_url(&format!("{}/v1/{suffix}", self.issuer.trim_end_matches('/'))),
            parse_url,
        )
    }

    /// Validates required fields and URL syntax.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` naming the first unusable field.
    pub fn validate(&self) -> DomainResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(DomainError::InvalidConfig("oidc.issuer is required".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "oidc.client_id is required".to_string(),
            ));
        }
        if self.scopes.is_empty() {
            return Err(DomainError::InvalidConfig(
                "oidc.scopes must not be empty".to_string(),
            ));
        }
        parse_url(&self.issuer)?;
        self.redirect_url()?;
        self.authorization_url()?;
        self.token_url()?;
        if let Some(uri) = &self.post_logout_redirect_uri {
            parse_url(uri)?;
        }
        Ok(())
    }
}

/// Resource API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Collection URL, e.g. `http://localhost:8000/items/`.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Collection URL with a guaranteed trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL cannot be parsed.
    pub fn collection_url(&self) -> DomainResult<Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        parse_url(&base)
    }

    /// Validates the base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` naming the first unusable field.
    pub fn validate(&self) -> DomainResult<()> {
        let url = self.collection_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::InvalidConfig(
                "api.base_url must use http or https".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "api.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Identity provider settings.
    pub oidc: OidcConfig,
    /// Resource API settings.
    #[serde(default)]
    pub api: ApiConfig,
}

impl ClientConfig {
    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> DomainResult<()> {
        self.oidc.validate()?;
        self.api.validate()
    }
}

fn parse_url(value: &str) -> DomainResult<Url> {
    Url::parse(value).map_err(|e| DomainError::InvalidUrl(format!("{e}: {value}")))
}
