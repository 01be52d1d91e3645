//! In-memory credential storage with expiry tracking.
//!
//! The store is the opaque holder of the current credential, keyed by the
//! session key of the OIDC client. It carries no session logic: the
//! session manager decides when to write, read or drop entries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use warden_domain::Credential;

/// Seconds before expiry at which a credential counts as expiring.
const EXPIRING_WINDOW_SECONDS: i64 = 60;

/// Thread-safe in-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    credentials: Arc<RwLock<HashMap<String, Credential>>>,
}

impl TokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential under `key`, replacing any previous one.
    pub async fn store(&self, key: impl Into<String>, credential: Credential) {
        let mut credentials = self.credentials.write().await;
        credentials.insert(key.into(), credential);
    }

    /// Get a credential that is still valid at `now`.
    pub async fn get_valid(&self, key: &str, now: DateTime<Utc>) -> Option<Credential> {
        let credentials = self.credentials.read().await;
        credentials
            .get(key)
            .filter(|credential| !credential.is_expired(now))
            .cloned()
    }

    /// Remove a credential.
    pub async fn remove(&self, key: &str) -> Option<Credential> {
        let mut credentials = self.credentials.write().await;
        credentials.remove(key)
    }

    /// Remove the credential under `key` only if it still carries `access_token`.
    pub async fn remove_if_current(&self, key: &str, access_token: &str) -> bool {
        let mut credentials = self.credentials.write().await;
        if credentials
            .get(key)
            .is_some_and(|c| c.access_token == access_token)
        {
            credentials.remove(key);
            return true;
        }
        false
    }

    /// Get credential status for display.
    pub async fn get_status(&self, key: &str, now: DateTime<Utc>) -> TokenStatus {
        let credentials = self.credentials.read().await;
        credentials
            .get(key)
            .map_or(TokenStatus::NotAuthenticated, |credential| {
                if credential.is_expired(now) {
                    TokenStatus::Expired
                } else if credential.is_expired_or_expiring(now, EXPIRING_WINDOW_SECONDS) {
                    TokenStatus::Expiring {
                        seconds_remaining: credential.seconds_until_expiry(now).unwrap_or(0),
                    }
                } else {
                    TokenStatus::Valid {
                        seconds_remaining: credential.seconds_until_expiry(now),
                    }
                }
            })
    }

    /// Get count of stored credentials.
    #[cfg(test)]
    pub(crate) async fn count(&self) -> usize {
        let credentials = self.credentials.read().await;
        credentials.len()
    }
}

/// Status of a stored credential for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No credential exists for this key.
    NotAuthenticated,
    /// Credential is valid and not expiring soon.
    Valid {
        /// Seconds until expiry, or None if no expiry.
        seconds_remaining: Option<i64>,
    },
    /// Credential is valid but will expire soon.
    Expiring {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Credential has expired; a new sign-in is needed.
    Expired,
}

impl TokenStatus {
    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Valid {
                seconds_remaining: Some(secs),
            } => {
                if *secs > 3600 {
                    format!("Valid for {} hours", secs / 3600)
                } else if *secs > 60 {
                    format!("Valid for {} minutes", secs / 60)
                } else {
                    format!("Valid for {secs} seconds")
                }
            }
            Self::Valid {
                seconds_remaining: None,
            } => "Valid (no expiry)".to_string(),
            Self::Expiring { seconds_remaining } => {
                format!("Expiring in {seconds_remaining} seconds")
            }
            Self::Expired => "Expired, sign in again".to_string(),
        }
    }
}
