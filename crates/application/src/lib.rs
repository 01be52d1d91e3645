//! Warden Application - Session lifecycle and resource access
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for external dependencies)
//! - The session manager, route guard and resource client
//! - The items view model
//! - Application-level error handling

pub mod auth;
pub mod error;
pub mod guard;
pub mod ports;
pub mod resource_client;
pub mod views;

#[cfg(test)]
mod test_support;

pub use auth::{AuthSessionManager, TokenStatus, TokenStore};
pub use error::{AuthExchangeError, ResourceError, SessionError};
pub use guard::{GuardWatch, RouteGuard};
pub use ports::{
    ApiCallError, AuthorizationRequest, Clock, IdentityProvider, ItemApi, Navigator,
    ProviderError,
};
pub use resource_client::ResourceClient;
pub use views::{ItemsView, ViewStatus};
