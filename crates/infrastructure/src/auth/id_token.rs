//! ID token claim decoding.
//!
//! The ID token arrives over TLS straight from the token endpoint, so only
//! its payload is read; the signature is not checked here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use warden_application::ports::ProviderError;
use warden_domain::IdentityClaims;

/// Decodes the claims segment of a compact JWS.
///
/// # Errors
///
/// Returns `ProviderError::InvalidResponse` if the token is not a
/// three-part JWS with a JSON payload carrying `sub`.
pub fn decode_claims(id_token: &str) -> Result<IdentityClaims, ProviderError> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(ProviderError::InvalidResponse(
            "ID token is not a compact JWS".to_string(),
        ));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ProviderError::InvalidResponse(format!("ID token payload: {e}")))?;
    serde_json::from_slice(&payload)
        .map_err(|e| ProviderError::InvalidResponse(format!("ID token claims: {e}")))
}
