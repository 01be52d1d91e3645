//! Authorization callback parsing and navigation URL helpers.

use url::Url;

use crate::error::{DomainError, DomainResult};

/// Base used to resolve app-relative URIs such as `/login/callback?code=X`.
const RELATIVE_BASE: &str = "http://app.invalid/";

/// What the identity provider put on the callback URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    /// The user authorized the client.
    Code {
        /// Authorization code to exchange.
        code: String,
        /// Opaque state echoed back by the provider.
        state: Option<String>,
    },
    /// The provider refused or failed the authorization.
    Error {
        /// OAuth2 error code (e.g. `access_denied`).
        error: String,
        /// Human-readable description, if any.
        description: Option<String>,
        /// Opaque state echoed back by the provider.
        state: Option<String>,
    },
}

impl AuthorizationResponse {
    /// Parses the authorization response carried in `uri`'s query string.
    ///
    /// Accepts absolute URLs and app-relative URIs.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MalformedCallback` if the URI cannot be parsed or
    /// carries neither `code` nor `error`.
    pub fn parse(uri: &str) -> DomainResult<Self> {
        let url = parse_uri(uri)?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Ok(Self::Error {
                error,
                description,
                state,
            });
        }

        match code {
            Some(code) if !code.is_empty() => Ok(Self::Code { code, state }),
            _ => Err(DomainError::MalformedCallback(
                "no authorization code in callback".to_string(),
            )),
        }
    }
}

/// Returns true if `uri` points at the path of `redirect_uri`.
#[must_use]
pub fn is_callback_uri(uri: &str, redirect_uri: &Url) -> bool {
    parse_uri(uri).is_ok_and(|url| url.path() == redirect_uri.path())
}

/// Converts `uri` into a URL relative to `origin` (path, query and fragment).
///
/// URIs pointing at another origin, or that cannot be parsed, fall back to `/`.
#[must_use]
pub fn to_relative_url(uri: &str, origin: &Url) -> String {
    let Ok(url) = origin.join(uri) else {
        return "/".to_string();
    };
    if url.origin() != origin.origin() {
        return "/".to_string();
    }

    let mut relative = url.path().to_string();
    if let Some(query) = url.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    relative
}

fn parse_uri(uri: &str) -> DomainResult<Url> {
    match Url::parse(uri) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(uri))
            .map_err(|e| DomainError::MalformedCallback(format!("{e}: {uri}"))),
        Err(e) => Err(DomainError::MalformedCallback(format!("{e}: {uri}"))),
    }
}
