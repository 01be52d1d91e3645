//! Session lifecycle state machine.
//!
//! [`AuthSessionManager`] is the single owner of the [`Session`]. It drives
//! the redirect-based authorization code flow (with PKCE), exchanges the
//! callback for a credential, signs out, and drops the session when the
//! credential expires or the resource API rejects it.
//!
//! The session is published on a `tokio::sync::watch` channel. Every
//! transition replaces the whole value in one step, so subscribers and
//! `get_state()` callers only ever see complete snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;
use warden_domain::{
    AuthorizationResponse, Credential, DomainResult, OidcConfig, Session, SessionState,
    is_callback_uri, to_relative_url,
};

use super::pkce::{generate_pkce, random_token};
use super::{TokenStatus, TokenStore};
use crate::error::{AuthExchangeError, SessionError};
use crate::ports::{AuthorizationRequest, Clock, IdentityProvider, Navigator};

/// Secrets of the sign-in attempt awaiting its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingAuthorization {
    state: String,
    nonce: String,
    code_verifier: String,
}

/// Owner of the session state machine.
///
/// Construct one per process and share it by `Arc` with the route guard and
/// the resource client.
pub struct AuthSessionManager {
    session_key: String,
    app_origin: Url,
    callback_url: Url,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    token_store: Arc<TokenStore>,
    session: watch::Sender<Session>,
    pending: Mutex<Option<PendingAuthorization>>,
    /// Bumped by sign-out and dispose; a callback started in an older
    /// generation may not install its credential.
    generation: AtomicU64,
    disposed: AtomicBool,
}

impl AuthSessionManager {
    /// Creates a manager in the `Unknown` state.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the redirect URI in `config` is unusable.
    pub fn new(
        config: &OidcConfig,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        token_store: Arc<TokenStore>,
    ) -> DomainResult<Self> {
        Ok(Self {
            session_key: config.session_key(),
            app_origin: config.app_origin()?,
            callback_url: config.redirect_url()?,
            provider,
            navigator,
            clock,
            token_store,
            session: watch::Sender::new(Session::unknown()),
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    /// Resolves the `Unknown` state from the token store.
    ///
    /// A stored, unexpired credential makes the session `Authenticated`;
    /// anything else makes it `Unauthenticated`. Already resolved sessions
    /// are left alone.
    pub async fn init(&self) -> SessionState {
        self.disposed.store(false, Ordering::SeqCst);

        let current = self.get_state();
        if current.is_resolved() {
            return current.state();
        }

        let now = self.clock.now();
        let pending_uri = current.pending_original_uri().map(str::to_string);
        let next = match self.token_store.get_valid(&self.session_key, now).await {
            Some(credential) => {
                debug!(token = %credential.token_preview(), "restored stored credential");
                Session::authenticated(credential, pending_uri)
            }
            None => {
                if self.token_store.remove(&self.session_key).await.is_some() {
                    debug!("dropped expired stored credential");
                }
                Session::unauthenticated(pending_uri)
            }
        };

        self.session.send_if_modified(|session| {
            if session.is_resolved() {
                return false;
            }
            *session = next;
            true
        });

        let state = self.session.borrow().state();
        info!(?state, "session resolved");
        state
    }

    /// Returns to `Unknown` and forgets any sign-in in progress.
    ///
    /// The token store is left intact so a later `init()` can restore it.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().take();
        self.session.send_replace(Session::unknown());
        debug!("session manager disposed");
    }

    /// Current session snapshot. Never blocks, never has side effects.
    #[must_use]
    pub fn get_state(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Returns true if `uri` is this client's authorization callback.
    #[must_use]
    pub fn is_callback(&self, uri: &str) -> bool {
        is_callback_uri(uri, &self.callback_url)
    }

    /// Records where to send the user once sign-in completes.
    ///
    /// Only the pending URI changes, so subscribers are not notified.
    pub fn set_original_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        self.session.send_if_modified(|session| {
            session.set_pending_original_uri(Some(uri));
            false
        });
    }

    /// Starts the authorization code flow with a full-page redirect.
    ///
    /// Does nothing when the session is already authenticated.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the authorization URL cannot be built.
    pub fn sign_in(&self) -> Result<(), SessionError> {
        if self.session.borrow().is_authenticated() {
            debug!("sign-in skipped, session already authenticated");
            return Ok(());
        }

        let pkce = generate_pkce();
        let pending = PendingAuthorization {
            state: random_token(),
            nonce: random_token(),
            code_verifier: pkce.verifier,
        };
        let url = self.provider.authorization_url(&AuthorizationRequest {
            state: pending.state.clone(),
            nonce: pending.nonce.clone(),
            code_challenge: pkce.challenge,
        })?;

        *self.pending.lock() = Some(pending);
        info!(host = url.host_str().unwrap_or_default(), "redirecting to identity provider");
        self.navigator.redirect(&url);
        Ok(())
    }

    /// Completes sign-in from the callback URI the provider redirected to.
    ///
    /// On success the session becomes `Authenticated` and navigation is
    /// restored to the pending original URI (or `/`). On failure the
    /// session becomes `Unauthenticated` with no credential. A sign-out
    /// issued while the code is being exchanged wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AuthExchange` describing why the callback was refused.
    pub async fn handle_callback(&self, current_uri: &str) -> Result<(), SessionError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let pending = self.pending.lock().take();

        match self.exchange(current_uri, pending).await {
            Ok(credential) => self
                .complete_sign_in(credential, generation)
                .await
                .map_err(SessionError::from),
            Err(error) => {
                warn!(%error, "authorization callback failed");
                self.token_store.remove(&self.session_key).await;
                self.become_unauthenticated();
                Err(error.into())
            }
        }
    }

    async fn exchange(
        &self,
        current_uri: &str,
        pending: Option<PendingAuthorization>,
    ) -> Result<Credential, AuthExchangeError> {
        let response = AuthorizationResponse::parse(current_uri)
            .map_err(|e| AuthExchangeError::MalformedCallback(e.to_string()))?;

        let (code, state) = match response {
            AuthorizationResponse::Error {
                error, description, ..
            } => return Err(AuthExchangeError::ProviderDenied { error, description }),
            AuthorizationResponse::Code { code, state } => (code, state),
        };

        let pending = pending.ok_or(AuthExchangeError::NoPendingAuthorization)?;
        if state.as_deref() != Some(pending.state.as_str()) {
            return Err(AuthExchangeError::StateMismatch);
        }

        debug!("exchanging authorization code");
        let credential = self
            .provider
            .exchange_code(&code, &pending.code_verifier)
            .await?;

        if let Some(nonce) = credential.claims.as_ref().and_then(|c| c.nonce.as_deref())
            && nonce != pending.nonce
        {
            return Err(AuthExchangeError::NonceMismatch);
        }
        if credential.is_expired(self.clock.now()) {
            return Err(AuthExchangeError::ExchangeRejected(
                "credential already expired".to_string(),
            ));
        }

        Ok(credential)
    }

    async fn complete_sign_in(
        &self,
        credential: Credential,
        generation: u64,
    ) -> Result<(), AuthExchangeError> {
        self.token_store
            .store(self.session_key.clone(), credential.clone())
            .await;

        let mut original_uri = None;
        let installed = self.session.send_if_modified(|session| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            original_uri = session.pending_original_uri().map(str::to_string);
            *session = Session::authenticated(credential.clone(), None);
            true
        });

        if !installed {
            self.token_store
                .remove_if_current(&self.session_key, &credential.access_token)
                .await;
            warn!("sign-in cancelled by a sign-out during the code exchange");
            return Err(AuthExchangeError::Cancelled);
        }
        info!(
            token = %credential.token_preview(),
            subject = credential.subject().unwrap_or("-"),
            "signed in"
        );

        let target = to_relative_url(original_uri.as_deref().unwrap_or("/"), &self.app_origin);
        debug!(%target, "restoring navigation");
        self.navigator.restore_original_uri(&target);
        Ok(())
    }

    /// Signs out locally, then at the provider.
    ///
    /// The local session is cleared before the provider is contacted, so a
    /// provider failure never leaves a half-signed-out session. Idempotent
    /// when there is nothing to sign out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the token revocation fails.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().take();
        let stored = self.token_store.remove(&self.session_key).await;

        let mut previous = None;
        self.session.send_if_modified(|session| {
            if session.state() == SessionState::Unauthenticated {
                return false;
            }
            previous = session.credential().cloned();
            *session = Session::unauthenticated(None);
            true
        });

        let Some(credential) = previous.or(stored) else {
            debug!("sign-out skipped, no session");
            return Ok(());
        };

        info!(token = %credential.token_preview(), "signing out");
        let revoked = self.provider.revoke(&credential).await;
        if let Err(error) = &revoked {
            warn!(%error, "token revocation failed");
        }

        if let Some(url) = self.provider.end_session_url(credential.id_token.as_deref()) {
            self.navigator.redirect(&url);
        }

        revoked.map_err(SessionError::from)
    }

    /// Credential to call the resource API with.
    ///
    /// Returns `None` unless the session is authenticated. A credential found
    /// expired here is dropped and the session becomes `Unauthenticated`.
    pub async fn current_credential(&self) -> Option<Credential> {
        let credential = self.session.borrow().credential().cloned()?;

        if credential.is_expired(self.clock.now()) {
            debug!(token = %credential.token_preview(), "credential expired");
            self.invalidate(&credential).await;
            return None;
        }

        Some(credential)
    }

    /// Drops `credential` after the API rejected it.
    ///
    /// Only acts if `credential` is still the session's credential, so a
    /// late 401 cannot end a newer session. Returns true if the session
    /// changed.
    pub async fn invalidate(&self, credential: &Credential) -> bool {
        self.token_store
            .remove_if_current(&self.session_key, &credential.access_token)
            .await;

        let changed = self.session.send_if_modified(|session| {
            let current = session
                .credential()
                .is_some_and(|c| c.access_token == credential.access_token);
            if current {
                let pending_uri = session.pending_original_uri().map(str::to_string);
                *session = Session::unauthenticated(pending_uri);
            }
            current
        });

        if changed {
            info!(token = %credential.token_preview(), "session invalidated");
        }
        changed
    }

    /// Drops the session when the credential's expiry instant passes.
    ///
    /// Runs until `dispose()` is called; spawn it next to the manager.
    pub async fn watch_expiry(&self) {
        let mut receiver = self.session.subscribe();

        while !self.disposed.load(Ordering::SeqCst) {
            let expires_at = receiver
                .borrow_and_update()
                .credential()
                .and_then(|c| c.expires_at);

            match expires_at {
                Some(expires_at) => {
                    let wait = (expires_at - self.clock.now()).to_std().unwrap_or_default();
                    tokio::select! {
                        () = tokio::time::sleep(wait) => {
                            self.current_credential().await;
                        }
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
                None => {
                    if receiver.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Status of the stored credential for display.
    pub async fn token_status(&self) -> TokenStatus {
        self.token_store
            .get_status(&self.session_key, self.clock.now())
            .await
    }

    fn become_unauthenticated(&self) {
        self.session.send_modify(|session| {
            let pending_uri = session.pending_original_uri().map(str::to_string);
            *session = Session::unauthenticated(pending_uri);
        });
    }
}
