//! Warden Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading.

pub mod adapters;
pub mod auth;
pub mod config;

pub use adapters::{BrowserNavigator, ReqwestItemApi, SystemClock};
pub use auth::OidcProvider;
pub use config::{ConfigError, ConfigLoader};
