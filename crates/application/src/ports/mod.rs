//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod clock;
mod identity_provider;
mod item_api;
mod navigator;

pub use clock::Clock;
pub use identity_provider::{AuthorizationRequest, IdentityProvider, ProviderError};
pub use item_api::{ApiCallError, ItemApi};
pub use navigator::Navigator;
