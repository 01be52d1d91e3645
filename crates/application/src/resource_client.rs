//! Authenticated CRUD client for the item collection.
//!
//! The cache only ever holds the result of a completed `list()` call.
//! Mutations commit on the server and then refresh; they never edit the
//! cache directly. Each `list()` takes a ticket, and a response only
//! replaces the cache if no newer `list()` has been applied already.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use warden_domain::{Credential, Item, ItemDraft, ItemId, Session};

use crate::auth::AuthSessionManager;
use crate::error::ResourceError;
use crate::ports::{ApiCallError, ItemApi};

#[derive(Debug, Default)]
struct ItemCache {
    items: Vec<Item>,
    applied_ticket: u64,
}

/// Item collection client bound to the shared session.
pub struct ResourceClient {
    session: Arc<AuthSessionManager>,
    api: Arc<dyn ItemApi>,
    cache: Mutex<ItemCache>,
    next_ticket: AtomicU64,
}

impl ResourceClient {
    /// Creates a client with an empty cache.
    #[must_use]
    pub fn new(session: Arc<AuthSessionManager>, api: Arc<dyn ItemApi>) -> Self {
        Self {
            session,
            api,
            cache: Mutex::new(ItemCache::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Fetches the whole collection and replaces the cache.
    ///
    /// Returns the fetched items in server order, even when a newer
    /// `list()` already landed and this response is not applied.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Unauthorized` without a network call when
    /// the session is not authenticated, or the API failure otherwise.
    pub async fn list(&self) -> Result<Vec<Item>, ResourceError> {
        let credential = self.credential().await?;
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.api.list(&credential).await;
        let items = self.settle(&credential, result).await?;

        let mut cache = self.cache.lock();
        if ticket > cache.applied_ticket {
            cache.items.clone_from(&items);
            cache.applied_ticket = ticket;
            debug!(ticket, count = items.len(), "item cache replaced");
        } else {
            debug!(ticket, applied = cache.applied_ticket, "stale list response discarded");
        }
        Ok(items)
    }

    /// Fetches one item. The cache is left alone.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list); a missing item is an API error.
    pub async fn get(&self, id: &ItemId) -> Result<Item, ResourceError> {
        let credential = self.credential().await?;
        let result = self.api.get(&credential, id).await;
        self.settle(&credential, result).await
    }

    /// Submits `draft`, clears it, then refreshes the list.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Unauthorized` without a session, then
    /// `ResourceError::InvalidDraft` before any call if the draft is invalid.
    /// The draft is kept when the submission fails.
    pub async fn create(&self, draft: &mut ItemDraft) -> Result<(), ResourceError> {
        let credential = self.credential().await?;
        draft.validate()?;

        let result = self.api.create(&credential, draft).await;
        self.settle(&credential, result).await?;
        info!(name = %draft.name, "item created");

        draft.clear();
        self.list().await.map(drop)
    }

    /// Replaces the item's fields, then refreshes the list.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub async fn update(&self, id: &ItemId, draft: &ItemDraft) -> Result<(), ResourceError> {
        let credential = self.credential().await?;
        draft.validate()?;

        let result = self.api.update(&credential, id, draft).await;
        self.settle(&credential, result).await?;
        info!(%id, "item updated");

        self.list().await.map(drop)
    }

    /// Removes the item, then refreshes the list.
    ///
    /// Unknown ids are not checked locally; the API's answer decides.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    pub async fn delete(&self, id: &ItemId) -> Result<(), ResourceError> {
        let credential = self.credential().await?;

        let result = self.api.delete(&credential, id).await;
        self.settle(&credential, result).await?;
        info!(%id, "item deleted");

        self.list().await.map(drop)
    }

    /// The result of the most recently applied `list()`.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.cache.lock().items.clone()
    }

    /// Empties the cache and discards every `list()` still in flight.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.items.clear();
        cache.applied_ticket = self.next_ticket.load(Ordering::SeqCst);
    }

    /// Reacts to a session snapshot; the cache does not outlive the session.
    pub fn on_session_change(&self, session: &Session) {
        if !session.is_authenticated() {
            self.clear_cache();
        }
    }

    /// Applies [`on_session_change`](Self::on_session_change) to every
    /// transition. Runs until the task is aborted.
    pub async fn follow_session(&self) {
        let mut receiver = self.session.subscribe();
        loop {
            let session = receiver.borrow_and_update().clone();
            self.on_session_change(&session);
            if receiver.changed().await.is_err() {
                break;
            }
        }
    }

    async fn credential(&self) -> Result<Credential, ResourceError> {
        self.session
            .current_credential()
            .await
            .ok_or(ResourceError::Unauthorized)
    }

    async fn settle<T: Send>(
        &self,
        credential: &Credential,
        result: Result<T, ApiCallError>,
    ) -> Result<T, ResourceError> {
        match result {
            Ok(value) => Ok(value),
            Err(error) if error.is_unauthorized() => {
                warn!(token = %credential.token_preview(), "API rejected the credential");
                self.session.invalidate(credential).await;
                self.clear_cache();
                Err(ResourceError::Unauthorized)
            }
            Err(error) => {
                warn!(%error, "item API call failed");
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::{Harness, InMemoryItemApi, item};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;
    use warden_domain::SessionState;

    async fn signed_in(api: Arc<InMemoryItemApi>) -> (Harness, ResourceClient) {
        let harness = Harness::new();
        harness.sign_in().await;
        let client = ResourceClient::new(harness.manager.clone(), api);
        (harness, client)
    }

    #[tokio::test]
    async fn test_list_replaces_cache_in_server_order() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![
            item(2, "bread"),
            item(1, "milk"),
        ]));
        let (_harness, client) = signed_in(api).await;

        let items = client.list().await.unwrap();

        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["bread", "milk"]);
        assert_eq!(client.items(), items);
    }

    #[tokio::test]
    async fn test_calls_without_session_make_no_request() {
        let api = Arc::new(InMemoryItemApi::new());
        let harness = Harness::new();
        harness.manager.init().await;
        let client = ResourceClient::new(harness.manager.clone(), api.clone());

        assert_eq!(client.list().await, Err(ResourceError::Unauthorized));
        let mut draft = ItemDraft::new("A", "B");
        assert_eq!(client.create(&mut draft).await, Err(ResourceError::Unauthorized));
        assert_eq!(
            client.delete(&ItemId::from(1)).await,
            Err(ResourceError::Unauthorized)
        );
        assert_eq!(api.calls(), 0);
        assert_eq!(draft, ItemDraft::new("A", "B"));
    }

    #[tokio::test]
    async fn test_signed_out_blank_draft_is_unauthorized() {
        let api = Arc::new(InMemoryItemApi::new());
        let harness = Harness::new();
        harness.manager.init().await;
        let client = ResourceClient::new(harness.manager.clone(), api.clone());

        let mut blank = ItemDraft::new("", "");
        assert_eq!(client.create(&mut blank).await, Err(ResourceError::Unauthorized));
        assert_eq!(
            client.update(&ItemId::from(1), &ItemDraft::new(" ", "")).await,
            Err(ResourceError::Unauthorized)
        );
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_clears_draft_and_refreshes() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![item(1, "bread")]));
        let (_harness, client) = signed_in(api.clone()).await;
        let before: Vec<_> = client.list().await.unwrap().into_iter().map(|i| i.id).collect();

        let mut draft = ItemDraft::new("A", "B");
        client.create(&mut draft).await.unwrap();

        assert!(draft.is_empty());
        let created: Vec<_> = client
            .items()
            .into_iter()
            .filter(|i| i.name == "A" && i.description == "B")
            .collect();
        assert_eq!(created.len(), 1);
        assert!(!before.contains(&created[0].id));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_before_request() {
        let api = Arc::new(InMemoryItemApi::new());
        let (_harness, client) = signed_in(api.clone()).await;
        let calls = api.calls();

        let mut draft = ItemDraft::new("   ", "B");
        let result = client.create(&mut draft).await;

        assert!(matches!(result, Err(ResourceError::InvalidDraft(_))));
        assert_eq!(api.calls(), calls);
        assert_eq!(draft.description, "B");
    }

    #[tokio::test]
    async fn test_failed_create_keeps_draft() {
        let api = Arc::new(InMemoryItemApi::new());
        let (_harness, client) = signed_in(api.clone()).await;
        api.fail_with(Some(ApiCallError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        }));

        let mut draft = ItemDraft::new("A", "B");
        let result = client.create(&mut draft).await;

        assert_eq!(
            result,
            Err(ResourceError::Api {
                status: Some(500),
                message: "Internal Server Error".to_string()
            })
        );
        assert_eq!(draft, ItemDraft::new("A", "B"));
    }

    #[tokio::test]
    async fn test_delete_refreshes_without_item() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![
            item(1, "milk"),
            item(2, "bread"),
        ]));
        let (_harness, client) = signed_in(api).await;

        client.delete(&ItemId::from(1)).await.unwrap();

        assert!(client.items().iter().all(|i| i.id != ItemId::from(1)));
        assert_eq!(client.items().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_api_error() {
        let api = Arc::new(InMemoryItemApi::new());
        let (harness, client) = signed_in(api).await;

        let result = client.delete(&ItemId::from(42)).await;

        assert!(matches!(
            result,
            Err(ResourceError::Api {
                status: Some(404),
                ..
            })
        ));
        assert!(harness.manager.get_state().is_authenticated());
    }

    #[tokio::test]
    async fn test_get_and_update() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![item(1, "milk")]));
        let (_harness, client) = signed_in(api).await;

        let fetched = client.get(&ItemId::from(1)).await.unwrap();
        assert_eq!(fetched.name, "milk");
        assert!(client.items().is_empty());

        client
            .update(&ItemId::from(1), &ItemDraft::new("oat milk", "1L"))
            .await
            .unwrap();
        assert_eq!(client.items()[0].name, "oat milk");
    }

    #[tokio::test]
    async fn test_unauthorized_response_signs_out() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![item(1, "milk")]));
        let (harness, client) = signed_in(api.clone()).await;
        client.list().await.unwrap();
        api.set_unauthorized(true);

        let result = client.list().await;

        assert_eq!(result, Err(ResourceError::Unauthorized));
        assert!(result.unwrap_err().requires_sign_in());
        assert_eq!(
            harness.manager.get_state().state(),
            SessionState::Unauthenticated
        );
        assert!(client.items().is_empty());
    }

    #[tokio::test]
    async fn test_bearer_token_is_current_credential() {
        let api = Arc::new(InMemoryItemApi::new());
        let (harness, client) = signed_in(api.clone()).await;

        client.list().await.unwrap();

        let expected = harness
            .manager
            .get_state()
            .credential()
            .unwrap()
            .access_token
            .clone();
        assert_eq!(api.tokens(), vec![expected]);
    }

    #[tokio::test]
    async fn test_on_session_change_clears_cache() {
        let api = Arc::new(InMemoryItemApi::with_items(vec![item(1, "milk")]));
        let (harness, client) = signed_in(api).await;
        client.list().await.unwrap();

        harness.manager.sign_out().await.unwrap();
        client.on_session_change(&harness.manager.get_state());

        assert!(client.items().is_empty());
    }

    /// List responses released by the test in any order.
    struct GatedItemApi {
        gates: Mutex<VecDeque<oneshot::Receiver<Vec<Item>>>>,
        started: AtomicUsize,
    }

    #[async_trait]
    impl ItemApi for GatedItemApi {
        async fn list(&self, _credential: &Credential) -> Result<Vec<Item>, ApiCallError> {
            let gate = self.gates.lock().pop_front().unwrap();
            self.started.fetch_add(1, Ordering::SeqCst);
            gate.await
                .map_err(|_| ApiCallError::Transport("gate dropped".to_string()))
        }

        async fn get(&self, _: &Credential, _: &ItemId) -> Result<Item, ApiCallError> {
            unimplemented!()
        }

        async fn create(&self, _: &Credential, _: &ItemDraft) -> Result<(), ApiCallError> {
            unimplemented!()
        }

        async fn update(
            &self,
            _: &Credential,
            _: &ItemId,
            _: &ItemDraft,
        ) -> Result<(), ApiCallError> {
            unimplemented!()
        }

        async fn delete(&self, _: &Credential, _: &ItemId) -> Result<(), ApiCallError> {
            unimplemented!()
        }
    }

    async fn wait_started(api: &GatedItemApi, count: usize) {
        while api.started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_out_of_order_list_keeps_newest() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let api = Arc::new(GatedItemApi {
            gates: Mutex::new(VecDeque::from([first_rx, second_rx])),
            started: AtomicUsize::new(0),
        });
        let harness = Harness::new();
        harness.sign_in().await;
        let client = Arc::new(ResourceClient::new(harness.manager.clone(), api.clone()));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.list().await }
        });
        wait_started(&api, 1).await;
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.list().await }
        });
        wait_started(&api, 2).await;

        second_tx.send(vec![item(2, "newer")]).unwrap();
        second.await.unwrap().unwrap();
        first_tx.send(vec![item(1, "older")]).unwrap();
        let stale = first.await.unwrap().unwrap();

        assert_eq!(stale, vec![item(1, "older")]);
        assert_eq!(client.items(), vec![item(2, "newer")]);
    }

    #[tokio::test]
    async fn test_clear_cache_discards_in_flight_list() {
        let (tx, rx) = oneshot::channel();
        let api = Arc::new(GatedItemApi {
            gates: Mutex::new(VecDeque::from([rx])),
            started: AtomicUsize::new(0),
        });
        let harness = Harness::new();
        harness.sign_in().await;
        let client = Arc::new(ResourceClient::new(harness.manager.clone(), api.clone()));

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.list().await }
        });
        wait_started(&api, 1).await;

        client.clear_cache();
        tx.send(vec![item(1, "milk")]).unwrap();
        pending.await.unwrap().unwrap();

        assert!(client.items().is_empty());
    }
}
