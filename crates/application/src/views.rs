//! View model for the protected items view.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use warden_domain::{Item, ItemDraft, ItemId};

use crate::error::ResourceError;
use crate::resource_client::ResourceClient;

/// What the items view shows besides the list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewStatus {
    /// Last operation succeeded (or none ran yet).
    #[default]
    Ready,
    /// Last operation failed; show an error indicator.
    Failed {
        /// Message for display.
        message: String,
    },
    /// The session is gone; the route guard takes over.
    SignInRequired,
}

impl From<&ResourceError> for ViewStatus {
    fn from(error: &ResourceError) -> Self {
        if error.requires_sign_in() {
            Self::SignInRequired
        } else {
            Self::Failed {
                message: error.to_string(),
            }
        }
    }
}

/// Draft editing and list operations of the items view.
///
/// Failures never escape as errors; they land in [`ViewStatus`].
pub struct ItemsView {
    client: Arc<ResourceClient>,
    draft: ItemDraft,
    status: ViewStatus,
}

impl ItemsView {
    /// Creates a view with an empty draft.
    #[must_use]
    pub fn new(client: Arc<ResourceClient>) -> Self {
        Self {
            client,
            draft: ItemDraft::default(),
            status: ViewStatus::Ready,
        }
    }

    /// Draft being edited.
    #[must_use]
    pub const fn draft(&self) -> &ItemDraft {
        &self.draft
    }

    /// Sets the draft name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    /// Sets the draft description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    /// Outcome of the last operation.
    #[must_use]
    pub const fn status(&self) -> &ViewStatus {
        &self.status
    }

    /// Items currently displayed.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.client.items()
    }

    /// Loads the list when the view is mounted.
    pub async fn mount(&mut self) -> &ViewStatus {
        let result = self.client.list().await.map(drop);
        self.record(result)
    }

    /// Creates an item from the draft.
    pub async fn submit(&mut self) -> &ViewStatus {
        let result = self.client.create(&mut self.draft).await;
        self.record(result)
    }

    /// Deletes an item.
    pub async fn delete(&mut self, id: &ItemId) -> &ViewStatus {
        let result = self.client.delete(id).await;
        self.record(result)
    }

    fn record(&mut self, result: Result<(), ResourceError>) -> &ViewStatus {
        self.status = match &result {
            Ok(()) => ViewStatus::Ready,
            Err(error) => ViewStatus::from(error),
        };
        debug!(status = ?self.status, "items view updated");
        &self.status
    }
}
