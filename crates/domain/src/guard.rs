//! Admission decision for protected views.

use serde::{Deserialize, Serialize};

use crate::auth::{Session, SessionState};

/// What a protected route should show for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session not resolved yet: show a placeholder, mount nothing.
    Loading,
    /// Signed out: remember the target and start sign-in.
    RedirectToSignIn,
    /// Signed in: mount the protected view.
    Render,
}

impl GuardDecision {
    /// Decision table for a session snapshot.
    #[must_use]
    pub const fn for_session(session: &Session) -> Self {
        match session.state() {
            SessionState::Unknown => Self::Loading,
            SessionState::Unauthenticated => Self::RedirectToSignIn,
            SessionState::Authenticated => Self::Render,
        }
    }

    /// Returns true if the protected view may be mounted.
    #[must_use]
    pub const fn mounts_view(self) -> bool {
        matches!(self, Self::Render)
    }
}
