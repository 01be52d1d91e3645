//! Credential types with expiry tracking

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Claims read from the ID token issued alongside the access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject identifier of the signed-in user.
    pub sub: String,
    /// E-mail address, when the `email` scope was granted.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, when the `profile` scope was granted.
    #[serde(default)]
    pub name: Option<String>,
    /// Nonce echoed back from the authorization request.
    #[serde(default)]
    pub nonce: Option<String>,
    /// ID token expiry as seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Access token plus its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The access token string
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// When the token expires (if known)
    pub expires_at: Option<DateTime<Utc>>,
    /// Raw ID token, kept as a hint for the end-session endpoint
    #[serde(default)]
    pub id_token: Option<String>,
    /// Identity claims decoded from the ID token
    #[serde(default)]
    pub claims: Option<IdentityClaims>,
    /// Scopes granted by this token
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When this credential was obtained
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential obtained at `now` that lives for `expires_in_secs`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCredential` if the lifetime does not fit
    /// in the representable time range.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let expires_at = expires_in_secs
            .map(|secs| expiry_after(now, secs))
            .transpose()?;

        Ok(Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at,
            id_token: None,
            claims: None,
            scopes: Vec::new(),
            obtained_at: now,
        })
    }

    /// Attaches the ID token and the claims decoded from it.
    #[must_use]
    pub fn with_identity(mut self, id_token: String, claims: Option<IdentityClaims>) -> Self {
        self.id_token = Some(id_token);
        self.claims = claims;
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Check if the credential is expired at `now`, or will be within `buffer_seconds`.
    #[must_use]
    pub fn is_expired_or_expiring(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(buffer_seconds) >= expires_at)
    }

    /// Check if the credential is expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_or_expiring(now, 0)
    }

    /// Time until expiry in seconds, or None if no expiry.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|exp| (exp - now).num_seconds())
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Preview of the access token safe for logs (first 8 chars + ...).
    #[must_use]
    pub fn token_preview(&self) -> String {
        token_preview(&self.access_token)
    }

    /// Subject of the signed-in user, if the ID token carried one.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }
}

fn expiry_after(now: DateTime<Utc>, secs: u64) -> DomainResult<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| DomainError::InvalidCredential(format!("expires_in {secs} is out of range")))
}

/// Get a preview of a token (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.chars().count() > 12 {
        let head: String = token.chars().take(8).collect();
        format!("{head}...")
    } else {
        token.to_string()
    }
}
