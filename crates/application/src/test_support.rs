//! In-memory port implementations shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use url::Url;
use warden_domain::{Credential, IdentityClaims, Item, ItemDraft, ItemId, OidcConfig};

use crate::auth::{AuthSessionManager, TokenStore};
use crate::ports::{
    ApiCallError, AuthorizationRequest, Clock, IdentityProvider, ItemApi, Navigator,
    ProviderError,
};

/// Clock that only moves when told to.
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Navigator that records every redirect and restore.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Url>>,
    restored: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<Url> {
        self.redirects.lock().clone()
    }

    pub fn restored(&self) -> Vec<String> {
        self.restored.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &Url) {
        self.redirects.lock().push(url.clone());
    }

    fn restore_original_uri(&self, relative_uri: &str) {
        self.restored.lock().push(relative_uri.to_string());
    }

    fn current_uri(&self) -> String {
        self.restored.lock().last().cloned().unwrap_or_else(|| "/".to_string())
    }
}

/// Provider that accepts the code `good` and nothing else.
pub struct FakeProvider {
    clock: Arc<MockClock>,
    last_nonce: Mutex<Option<String>>,
    wrong_nonce: AtomicBool,
    fail_revoke: AtomicBool,
    exchanges: AtomicUsize,
    revoked: Mutex<Vec<String>>,
    end_session: Option<Url>,
    exchange_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeProvider {
    pub fn new(clock: Arc<MockClock>) -> Self {
        Self {
            clock,
            last_nonce: Mutex::new(None),
            wrong_nonce: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            exchanges: AtomicUsize::new(0),
            revoked: Mutex::new(Vec::new()),
            end_session: None,
            exchange_gate: Mutex::new(None),
        }
    }

    pub fn with_end_session(mut self, url: Url) -> Self {
        self.end_session = Some(url);
        self
    }

    pub fn set_wrong_nonce(&self, value: bool) {
        self.wrong_nonce.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_revoke(&self, value: bool) {
        self.fail_revoke.store(value, Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().clone()
    }

    /// Makes the next code exchange wait until the returned sender fires.
    pub fn hold_exchange(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.exchange_gate.lock() = Some(gate);
        release
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url, ProviderError> {
        *self.last_nonce.lock() = Some(request.nonce.clone());
        Url::parse_with_params(
            "https://idp.test/authorize",
            &[
                ("state", request.state.as_str()),
                ("nonce", request.nonce.as_str()),
                ("code_challenge", request.code_challenge.as_str()),
            ],
        )
        .map_err(|e| ProviderError::Configuration(e.to_string()))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Credential, ProviderError> {
        let issued = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.exchange_gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if code != "good" || code_verifier.is_empty() {
            return Err(ProviderError::Rejected {
                error: "invalid_grant".to_string(),
                description: Some("authorization code is invalid or expired".to_string()),
            });
        }

        let nonce = if self.wrong_nonce.load(Ordering::SeqCst) {
            Some("someone-else".to_string())
        } else {
            self.last_nonce.lock().clone()
        };
        let claims = IdentityClaims {
            sub: "user-1".to_string(),
            nonce,
            ..IdentityClaims::default()
        };

        Ok(Credential::new(
            format!("access-token-{issued}"),
            "Bearer",
            Some(3600),
            self.clock.now(),
        )
        .unwrap()
        .with_identity("header.payload.signature".to_string(), Some(claims)))
    }

    async fn revoke(&self, credential: &Credential) -> Result<(), ProviderError> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("connection refused".to_string()));
        }
        self.revoked.lock().push(credential.access_token.clone());
        Ok(())
    }

    fn end_session_url(&self, _id_token_hint: Option<&str>) -> Option<Url> {
        self.end_session.clone()
    }
}

/// Item collection kept in memory, answering like the real API.
#[derive(Default)]
pub struct InMemoryItemApi {
    items: Mutex<Vec<Item>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    unauthorized: AtomicBool,
    failure: Mutex<Option<ApiCallError>>,
    tokens: Mutex<Vec<String>>,
}

impl InMemoryItemApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        let next = items.len() as i64 + 1;
        let api = Self::new();
        *api.items.lock() = items;
        api.next_id.store(next, Ordering::SeqCst);
        api
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }

    pub fn set_unauthorized(&self, value: bool) {
        self.unauthorized.store(value, Ordering::SeqCst);
    }

    pub fn fail_with(&self, error: Option<ApiCallError>) {
        *self.failure.lock() = error;
    }

    fn begin(&self, credential: &Credential) -> Result<(), ApiCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().push(credential.access_token.clone());
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(ApiCallError::Status {
                status: 401,
                body: "Unauthorized".to_string(),
            });
        }
        self.failure.lock().clone().map_or(Ok(()), Err)
    }

    fn not_found() -> ApiCallError {
        ApiCallError::Status {
            status: 404,
            body: "Item not found".to_string(),
        }
    }
}

#[async_trait]
impl ItemApi for InMemoryItemApi {
    async fn list(&self, credential: &Credential) -> Result<Vec<Item>, ApiCallError> {
        self.begin(credential)?;
        Ok(self.items.lock().clone())
    }

    async fn get(&self, credential: &Credential, id: &ItemId) -> Result<Item, ApiCallError> {
        self.begin(credential)?;
        self.items
            .lock()
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn create(
        &self,
        credential: &Credential,
        draft: &ItemDraft,
    ) -> Result<(), ApiCallError> {
        self.begin(credential)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.items.lock().push(Item {
            id: ItemId::from(id),
            name: draft.name.clone(),
            description: draft.description.clone(),
        });
        Ok(())
    }

    async fn update(
        &self,
        credential: &Credential,
        id: &ItemId,
        draft: &ItemDraft,
    ) -> Result<(), ApiCallError> {
        self.begin(credential)?;
        let mut items = self.items.lock();
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(Self::not_found)?;
        item.name.clone_from(&draft.name);
        item.description.clone_from(&draft.description);
        Ok(())
    }

    async fn delete(&self, credential: &Credential, id: &ItemId) -> Result<(), ApiCallError> {
        self.begin(credential)?;
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|item| &item.id != id);
        if items.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }
}

/// A session manager wired to in-memory ports.
pub struct Harness {
    pub config: OidcConfig,
    pub clock: Arc<MockClock>,
    pub provider: Arc<FakeProvider>,
    pub navigator: Arc<RecordingNavigator>,
    pub token_store: Arc<TokenStore>,
    pub manager: Arc<AuthSessionManager>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(MockClock::new());
        let provider = Arc::new(FakeProvider::new(clock.clone()));
        Self::with_parts(clock, provider, Arc::new(RecordingNavigator::new()))
    }

    pub fn with_parts(
        clock: Arc<MockClock>,
        provider: Arc<FakeProvider>,
        navigator: Arc<RecordingNavigator>,
    ) -> Self {
        let config = OidcConfig::new(
            "https://idp.test/oauth2/default",
            "client-1",
            "http://localhost:3000/login/callback",
        );
        let token_store = Arc::new(TokenStore::new());
        let manager = Arc::new(
            AuthSessionManager::new(
                &config,
                provider.clone(),
                navigator.clone(),
                clock.clone(),
                token_store.clone(),
            )
            .unwrap(),
        );

        Self {
            config,
            clock,
            provider,
            navigator,
            token_store,
            manager,
        }
    }

    /// Runs a full successful sign-in and returns the callback URI used.
    pub async fn sign_in(&self) -> String {
        self.manager.init().await;
        self.manager.sign_in().unwrap();
        let redirect = self.navigator.redirects().last().cloned().unwrap();
        let state = state_param(&redirect).unwrap();
        let callback = format!("/login/callback?code=good&state={state}");
        self.manager.handle_callback(&callback).await.unwrap();
        callback
    }
}

/// The `state` query parameter of an authorization redirect.
pub fn state_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}

pub fn item(id: i64, name: &str) -> Item {
    Item {
        id: ItemId::from(id),
        name: name.to_string(),
        description: format!("{name} description"),
    }
}
