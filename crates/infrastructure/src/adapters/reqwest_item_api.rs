//! Item API client implementation using reqwest.
//!
//! This adapter implements the `ItemApi` port against the REST collection
//! at `ApiConfig::base_url`. Every request carries the credential as the
//! `Authorization` header and is bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use warden_application::ports::{ApiCallError, ItemApi};
use warden_domain::{ApiConfig, Credential, Item, ItemDraft, ItemId};

/// HTTP adapter for the item collection.
pub struct ReqwestItemApi {
    client: Client,
    collection_url: Url,
    timeout_ms: u64,
}

impl ReqwestItemApi {
    /// Creates a client for the collection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiCallError> {
        let collection_url = config
            .collection_url()
            .map_err(|e| ApiCallError::Transport(e.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("Warden/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiCallError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, collection_url, config.timeout_ms))
    }

    /// Creates the adapter around an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, collection_url: Url, timeout_ms: u64) -> Self {
        Self {
            client,
            collection_url,
            timeout_ms,
        }
    }

    /// `{collection}/{id}`, with the id percent-encoded as one segment.
    fn item_url(&self, id: &ItemId) -> Result<Url, ApiCallError> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiCallError::Transport("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> Result<Response, ApiCallError> {
        let response = request
            .header(AUTHORIZATION, credential.authorization_header())
            .header(ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "item API responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiCallError::Status {
            status: status.as_u16(),
            body: error_detail(&body),
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiCallError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, self.timeout_ms))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiCallError::Malformed(e.to_string()))
    }

    /// Maps reqwest errors to `ApiCallError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> ApiCallError {
        if error.is_timeout() {
            return ApiCallError::Timeout { timeout_ms };
        }
        ApiCallError::Transport(error.to_string())
    }
}

/// FastAPI-style `{"detail": "..."}` bodies collapse to their message.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ItemApi for ReqwestItemApi {
    async fn list(&self, credential: &Credential) -> Result<Vec<Item>, ApiCallError> {
        let request = self.client.get(self.collection_url.clone());
        let response = self.send(request, credential).await?;
        self.decode(response).await
    }

    async fn get(&self, credential: &Credential, id: &ItemId) -> Result<Item, ApiCallError> {
        let request = self.client.get(self.item_url(id)?);
        let response = self.send(request, credential).await?;
        self.decode(response).await
    }

    async fn create(
        &self,
        credential: &Credential,
        draft: &ItemDraft,
    ) -> Result<(), ApiCallError> {
        let request = self.client.post(self.collection_url.clone()).json(draft);
        self.send(request, credential).await?;
        Ok(())
    }

    async fn update(
        &self,
        credential: &Credential,
        id: &ItemId,
        draft: &ItemDraft,
    ) -> Result<(), ApiCallError> {
        let request = self.client.put(self.item_url(id)?).json(draft);
        self.send(request, credential).await?;
        Ok(())
    }

    async fn delete(&self, credential: &Credential, id: &ItemId) -> Result<(), ApiCallError> {
        let request = self.client.delete(self.item_url(id)?);
        self.send(request, credential).await?;
        Ok(())
    }
}
