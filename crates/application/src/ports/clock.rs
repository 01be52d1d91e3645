//! Clock port used for credential expiry checks

use chrono::{DateTime, Utc};

/// Port for reading the current time.
///
/// Credential expiry is always judged against this clock so tests can
/// move time forward without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
