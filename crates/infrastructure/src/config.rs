//! Client configuration loading.
//!
//! Sources, later ones winning:
//! 1. JSON file named by `WARDEN_CONFIG` (optional)
//! 2. `WARDEN_*` environment variables
//!
//! The merged result is validated before it is returned.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;
use warden_domain::{ClientConfig, DomainError};

/// Path of the JSON config file.
pub const CONFIG_PATH_VAR: &str = "WARDEN_CONFIG";
/// Overrides `oidc.issuer`.
pub const ISSUER_VAR: &str = "WARDEN_ISSUER";
/// Overrides `oidc.client_id`.
pub const CLIENT_ID_VAR: &str = "WARDEN_CLIENT_ID";
/// Overrides `oidc.redirect_uri`.
pub const REDIRECT_URI_VAR: &str = "WARDEN_REDIRECT_URI";
/// Overrides `oidc.post_logout_redirect_uri`.
pub const POST_LOGOUT_REDIRECT_URI_VAR: &str = "WARDEN_POST_LOGOUT_REDIRECT_URI";
/// Overrides `api.base_url`.
pub const API_BASE_URL_VAR: &str = "WARDEN_API_BASE_URL";
/// Overrides `api.timeout_ms`.
pub const API_TIMEOUT_MS_VAR: &str = "WARDEN_API_TIMEOUT_MS";

const STRING_OVERRIDES: [(&str, &str, &str); 5] = [
    (ISSUER_VAR, "oidc", "issuer"),
    (CLIENT_ID_VAR, "oidc", "client_id"),
    (REDIRECT_URI_VAR, "oidc", "redirect_uri"),
    (POST_LOGOUT_REDIRECT_URI_VAR, "oidc", "post_logout_redirect_uri"),
    (API_BASE_URL_VAR, "api", "base_url"),
];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not a JSON object.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An environment override is not a number.
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// Required settings are missing or mistyped after merging.
    #[error("incomplete configuration: {0}")]
    Incomplete(serde_json::Error),

    /// The merged configuration failed validation.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Reads environment variables by name.
fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Loads [`ClientConfig`] from a file and variable overrides.
///
/// Variables are read through a lookup function so tests can supply their
/// own without touching the process environment.
pub struct ConfigLoader<F = fn(&str) -> Option<String>> {
    lookup: F,
}

impl ConfigLoader {
    /// Loader reading the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self { lookup: env_lookup }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Loader reading variables through `lookup`.
    pub const fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Reads, merges and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unreadable files, bad overrides,
    /// missing required settings or failed validation.
    pub async fn load(&self) -> Result<ClientConfig, ConfigError> {
        let root = match (self.lookup)(CONFIG_PATH_VAR) {
            Some(path) => Self::read_file(Path::new(&path)).await?,
            None => Map::new(),
        };
        self.resolve(root)
    }

    async fn read_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
        debug!(path = %path.display(), "reading config file");
        let content = fs::read(path).await.map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn resolve(&self, mut root: Map<String, Value>) -> Result<ClientConfig, ConfigError> {
        for (name, section, key) in STRING_OVERRIDES {
            if let Some(value) = (self.lookup)(name) {
                debug!(variable = name, "applying config override");
                set(&mut root, section, key, Value::String(value));
            }
        }

        if let Some(raw) = (self.lookup)(API_TIMEOUT_MS_VAR) {
            let timeout_ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: API_TIMEOUT_MS_VAR,
                value: raw.clone(),
            })?;
            set(&mut root, "api", "timeout_ms", Value::from(timeout_ms));
        }

        let config: ClientConfig =
            serde_json::from_value(Value::Object(root)).map_err(ConfigError::Incomplete)?;
        config.validate()?;
        Ok(config)
    }
}

fn set(root: &mut Map<String, Value>, section: &str, key: &str, value: Value) {
    let entry = root
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(fields) = entry {
        fields.insert(key.to_string(), value);
    }
}
