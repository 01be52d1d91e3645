//! Session state machine values.
//!
//! A [`Session`] is a snapshot: every state transition builds a new
//! value, so a reader never observes a half-applied change. The
//! constructors are the only way to build one and they keep the credential
//! present exactly when the state is [`SessionState::Authenticated`].

use serde::{Deserialize, Serialize};

use super::Credential;

/// Resolution state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not resolved yet; the only legal initial value.
    #[default]
    Unknown,
    /// Resolved without a usable credential.
    Unauthenticated,
    /// Resolved with a credential.
    Authenticated,
}

impl SessionState {
    /// Get a user-friendly message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unknown => "Checking session...",
            Self::Unauthenticated => "Signed out",
            Self::Authenticated => "Signed in",
        }
    }
}

/// Snapshot of the session owned by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    state: SessionState,
    credential: Option<Credential>,
    pending_original_uri: Option<String>,
}

impl Session {
    /// The initial, unresolved session.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// A resolved session without a credential.
    #[must_use]
    pub const fn unauthenticated(pending_original_uri: Option<String>) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            credential: None,
            pending_original_uri,
        }
    }

    /// A resolved session holding `credential`.
    #[must_use]
    pub const fn authenticated(credential: Credential, pending_original_uri: Option<String>) -> Self {
        Self {
            state: SessionState::Authenticated,
            credential: Some(credential),
            pending_original_uri,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Credential, present only while authenticated.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// URI the user wanted before being sent to sign in.
    #[must_use]
    pub fn pending_original_uri(&self) -> Option<&str> {
        self.pending_original_uri.as_deref()
    }

    /// Returns true if the state is `Authenticated`.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated)
    }

    /// Returns true once the state left `Unknown`.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self.state, SessionState::Unknown)
    }

    /// Replaces the pending URI without touching state or credential.
    pub fn set_pending_original_uri(&mut self, uri: Option<String>) {
        self.pending_original_uri = uri;
    }
}
