//! Warden Domain - Core session and item types
//!
//! This crate defines the domain model for the Warden session client.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod item;

pub use auth::{
    AuthorizationResponse, Credential, IdentityClaims, Session, SessionState, is_callback_uri,
    to_relative_url, token_preview,
};
pub use config::{ApiConfig, ClientConfig, OidcConfig};
pub use error::{DomainError, DomainResult};
pub use guard::GuardDecision;
pub use item::{Item, ItemDraft, ItemId};
