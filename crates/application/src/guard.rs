//! Route guard for protected views.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use warden_domain::{GuardDecision, Session};

use crate::auth::AuthSessionManager;

/// Admits a protected view only for an authenticated session.
///
/// A signed-out visit records the requested URI and starts sign-in, so the
/// user lands back on it after the callback.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<AuthSessionManager>,
}

impl RouteGuard {
    /// Creates a guard over the shared session manager.
    #[must_use]
    pub const fn new(session: Arc<AuthSessionManager>) -> Self {
        Self { session }
    }

    /// Decision for `requested_uri` from the current session snapshot.
    pub fn evaluate(&self, requested_uri: &str) -> GuardDecision {
        let session = self.session.get_state();
        self.decide(&session, requested_uri)
    }

    /// Follows the session and re-evaluates `requested_uri` on each change.
    #[must_use]
    pub fn watch(&self, requested_uri: impl Into<String>) -> GuardWatch {
        GuardWatch {
            guard: self.clone(),
            requested_uri: requested_uri.into(),
            receiver: self.session.subscribe(),
        }
    }

    fn decide(&self, session: &Session, requested_uri: &str) -> GuardDecision {
        let decision = GuardDecision::for_session(session);
        debug!(?decision, uri = requested_uri, "route guard evaluated");

        if decision == GuardDecision::RedirectToSignIn {
            self.session.set_original_uri(requested_uri);
            if let Err(error) = self.session.sign_in() {
                warn!(%error, "could not start sign-in");
            }
        }
        decision
    }
}

/// A guarded route kept in step with the session.
pub struct GuardWatch {
    guard: RouteGuard,
    requested_uri: String,
    receiver: watch::Receiver<Session>,
}

impl GuardWatch {
    /// Decision for the latest session snapshot.
    pub fn current(&mut self) -> GuardDecision {
        let session = self.receiver.borrow_and_update().clone();
        self.guard.decide(&session, &self.requested_uri)
    }

    /// Marks the latest snapshot as seen without deciding on it.
    ///
    /// Hosts call this after transitions they caused themselves, so
    /// [`changed`](Self::changed) only reports the ones they did not.
    pub fn acknowledge(&mut self) {
        self.receiver.mark_unchanged();
    }

    /// Waits for the next session transition and returns the new decision.
    ///
    /// Returns `None` once the session manager is gone.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_unknown_session_shows_loading() {
        let harness = Harness::new();
        let guard = RouteGuard::new(harness.manager.clone());

        assert_eq!(guard.evaluate("/items"), GuardDecision::Loading);
        assert!(harness.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_redirects_and_records_uri() {
        let harness = Harness::new();
        harness.manager.init().await;
        let guard = RouteGuard::new(harness.manager.clone());

        assert_eq!(guard.evaluate("/items?page=2"), GuardDecision::RedirectToSignIn);
        assert_eq!(harness.navigator.redirects().len(), 1);
        assert_eq!(
            harness.manager.get_state().pending_original_uri(),
            Some("/items?page=2")
        );
    }

    #[tokio::test]
    async fn test_signed_in_renders() {
        let harness = Harness::new();
        harness.sign_in().await;
        let guard = RouteGuard::new(harness.manager.clone());

        let decision = guard.evaluate("/items");
        assert_eq!(decision, GuardDecision::Render);
        assert!(decision.mounts_view());
    }

    #[tokio::test]
    async fn test_watch_follows_transitions() {
        let harness = Harness::new();
        let guard = RouteGuard::new(harness.manager.clone());
        let mut watch = guard.watch("/items");
        assert_eq!(watch.current(), GuardDecision::Loading);

        harness.manager.init().await;
        assert_eq!(watch.changed().await, Some(GuardDecision::RedirectToSignIn));

        let state = crate::test_support::state_param(
            harness.navigator.redirects().last().unwrap(),
        )
        .unwrap();
        harness
            .manager
            .handle_callback(&format!("/login/callback?code=good&state={state}"))
            .await
            .unwrap();

        assert_eq!(watch.changed().await, Some(GuardDecision::Render));
        assert_eq!(harness.navigator.restored(), vec!["/items".to_string()]);

        harness.manager.sign_out().await.unwrap();
        assert_eq!(watch.changed().await, Some(GuardDecision::RedirectToSignIn));
    }

    #[tokio::test]
    async fn test_watch_does_not_loop_on_recorded_uri() {
        let harness = Harness::new();
        harness.manager.init().await;
        let guard = RouteGuard::new(harness.manager.clone());
        let mut watch = guard.watch("/items");

        assert_eq!(watch.current(), GuardDecision::RedirectToSignIn);

        // Recording the URI must not wake the watcher again.
        let next = tokio::time::timeout(std::time::Duration::from_millis(50), watch.changed()).await;
        assert!(next.is_err());
        assert_eq!(harness.navigator.redirects().len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledged_transition_is_not_reported() {
        let harness = Harness::new();
        harness.sign_in().await;
        let guard = RouteGuard::new(harness.manager.clone());
        let mut watch = guard.watch("/items");
        assert_eq!(watch.current(), GuardDecision::Render);

        harness.manager.sign_out().await.unwrap();
        watch.acknowledge();

        let next = tokio::time::timeout(std::time::Duration::from_millis(50), watch.changed()).await;
        assert!(next.is_err());
        assert_eq!(harness.navigator.redirects().len(), 1, "no new sign-in redirect");
    }
}
