//! Authentication domain types

mod callback;
mod credential;
mod session;

pub use callback::{AuthorizationResponse, is_callback_uri, to_relative_url};
pub use credential::{Credential, IdentityClaims, token_preview};
pub use session::{Session, SessionState};
