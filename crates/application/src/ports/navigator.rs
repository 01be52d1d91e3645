//! Navigation port for the host environment (the browser tab).

use url::Url;

/// Port for reading and changing the host's current location.
pub trait Navigator: Send + Sync {
    /// Full-page redirect away from the application.
    fn redirect(&self, url: &Url);

    /// Replaces the current location with an origin-relative URI.
    fn restore_original_uri(&self, relative_uri: &str);

    /// Current location, origin-relative.
    fn current_uri(&self) -> String;
}
