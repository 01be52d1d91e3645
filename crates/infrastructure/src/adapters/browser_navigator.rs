//! Navigator adapter for a terminal host.
//!
//! Redirects leave the application, so they are handed to the system
//! browser. The in-app location is just remembered for the host to read.

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use warden_application::ports::Navigator;

/// Navigator that opens redirects in the system browser.
pub struct BrowserNavigator {
    location: Mutex<String>,
    last_redirect: Mutex<Option<Url>>,
    open_browser: bool,
}

impl BrowserNavigator {
    /// Creates a navigator at `/` that opens the system browser on redirects.
    #[must_use]
    pub fn new() -> Self {
        Self {
            location: Mutex::new("/".to_string()),
            last_redirect: Mutex::new(None),
            open_browser: true,
        }
    }

    /// Creates a navigator that only records redirects.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            open_browser: false,
            ..Self::new()
        }
    }

    /// The most recent full-page redirect, if any.
    #[must_use]
    pub fn last_redirect(&self) -> Option<Url> {
        self.last_redirect.lock().clone()
    }
}

impl Default for BrowserNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for BrowserNavigator {
    fn redirect(&self, url: &Url) {
        info!(host = url.host_str().unwrap_or_default(), path = url.path(), "leaving application");
        *self.last_redirect.lock() = Some(url.clone());

        if self.open_browser
            && let Err(error) = open::that(url.as_str())
        {
            warn!(%error, "could not open the system browser");
        }
    }

    fn restore_original_uri(&self, relative_uri: &str) {
        debug!(uri = relative_uri, "location replaced");
        *self.location.lock() = relative_uri.to_string();
    }

    fn current_uri(&self) -> String {
        self.location.lock().clone()
    }
}
