//! Component wiring and lifecycle.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;
use warden_application::{
    ApiCallError, AuthSessionManager, Clock, ItemsView, Navigator, ProviderError,
    ResourceClient, RouteGuard, SessionError, TokenStore,
};
use warden_domain::{ClientConfig, DomainError, GuardDecision, SessionState};
use warden_infrastructure::{
    BrowserNavigator, ConfigError, OidcProvider, ReqwestItemApi, SystemClock,
};

/// The protected route holding the items view.
pub const ITEMS_ROUTE: &str = "/items";

/// Errors raised while starting the host.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration values are unusable.
    #[error("configuration error: {0}")]
    Domain(#[from] DomainError),

    /// The identity provider adapter could not be built.
    #[error("identity provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    /// The item API adapter could not be built.
    #[error("item API setup failed: {0}")]
    Api(#[from] ApiCallError),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of visiting a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The callback completed sign-in; the location was restored.
    SignedIn {
        /// Location after the restore.
        location: String,
    },
    /// A regular route, admitted or not by the guard.
    Route(GuardDecision),
}

/// The wired session client.
pub struct App {
    session: Arc<AuthSessionManager>,
    guard: RouteGuard,
    client: Arc<ResourceClient>,
    navigator: Arc<BrowserNavigator>,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Builds every component from `config`.
    ///
    /// # Errors
    ///
    /// Returns an `AppError` if an adapter rejects the configuration.
    pub fn new(config: &ClientConfig, navigator: Arc<BrowserNavigator>) -> Result<Self, AppError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let provider = Arc::new(OidcProvider::new(
            &config.oidc,
            clock.clone(),
            config.api.timeout_ms,
        )?);
        let api = Arc::new(ReqwestItemApi::new(&config.api)?);

        let session = Arc::new(AuthSessionManager::new(
            &config.oidc,
            provider,
            navigator.clone() as Arc<dyn Navigator>,
            clock,
            Arc::new(TokenStore::new()),
        )?);
        let guard = RouteGuard::new(session.clone());
        let client = Arc::new(ResourceClient::new(session.clone(), api));

        Ok(Self {
            session,
            guard,
            client,
            navigator,
            tasks: Vec::new(),
        })
    }

    /// Resolves the session and starts the background followers.
    pub async fn start(&mut self) -> SessionState {
        let state = self.session.init().await;

        let client = self.client.clone();
        self.tasks
            .push(tokio::spawn(async move { client.follow_session().await }));
        let session = self.session.clone();
        self.tasks
            .push(tokio::spawn(async move { session.watch_expiry().await }));

        info!(?state, "warden started");
        state
    }

    /// Visits `uri` the way a browser would.
    ///
    /// The callback URI completes sign-in; anything else goes through the
    /// route guard.
    ///
    /// # Errors
    ///
    /// Returns a `SessionError` if the callback cannot be completed.
    pub async fn navigate(&self, uri: &str) -> Result<Navigation, SessionError> {
        if self.session.is_callback(uri) {
            self.session.handle_callback(uri).await?;
            return Ok(Navigation::SignedIn {
                location: self.navigator.current_uri(),
            });
        }

        self.navigator.restore_original_uri(uri);
        Ok(Navigation::Route(self.guard.evaluate(uri)))
    }

    /// Signs out locally and at the provider.
    ///
    /// # Errors
    ///
    /// Returns a `SessionError` if the provider could not revoke the token.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.session.sign_out().await
    }

    /// A fresh items view over the shared resource client.
    #[must_use]
    pub fn items_view(&self) -> ItemsView {
        ItemsView::new(self.client.clone())
    }

    /// The session manager.
    #[must_use]
    pub const fn session(&self) -> &Arc<AuthSessionManager> {
        &self.session
    }

    /// The route guard.
    #[must_use]
    pub const fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// The resource client.
    #[must_use]
    pub const fn client(&self) -> &Arc<ResourceClient> {
        &self.client
    }

    /// The navigator, for reading redirects.
    #[must_use]
    pub const fn navigator(&self) -> &Arc<BrowserNavigator> {
        &self.navigator
    }

    /// Stops the followers and returns the session to `Unknown`.
    pub fn shutdown(&mut self) {
        self.session.dispose();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
