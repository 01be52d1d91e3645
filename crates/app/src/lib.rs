//! Warden - host environment for the session client
//!
//! Wires the adapters to the session manager, route guard and resource
//! client, and provides the terminal front end that stands in for the
//! browser.

pub mod app;
pub mod shell;

pub use app::{App, AppError, ITEMS_ROUTE, Navigation};
pub use shell::{Command, Shell};
