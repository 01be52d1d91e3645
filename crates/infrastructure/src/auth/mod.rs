//! OIDC identity provider adapter.

pub(crate) mod id_token;
mod oidc_provider;

pub use id_token::decode_claims;
pub use oidc_provider::OidcProvider;
