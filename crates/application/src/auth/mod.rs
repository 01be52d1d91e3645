//! Authentication module for Warden.
//!
//! This module provides:
//! - In-memory credential storage with expiry tracking
//! - PKCE and random state generation
//! - The session manager driving sign-in, callback and sign-out

mod pkce;
mod session_manager;
mod token_store;

pub use pkce::{Pkce, challenge_for, generate_pkce, random_token};
pub use session_manager::AuthSessionManager;
pub use token_store::{TokenStatus, TokenStore};
