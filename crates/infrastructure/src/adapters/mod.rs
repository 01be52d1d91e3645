//! Port adapters.

mod browser_navigator;
mod reqwest_item_api;
mod system_clock;

pub use browser_navigator::BrowserNavigator;
pub use reqwest_item_api::ReqwestItemApi;
pub use system_clock::SystemClock;
