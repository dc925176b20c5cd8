//! HTTP collaborators for the kiosk: the listing endpoint and image storage.

use std::time::Duration;

mod listing;
mod resource;

pub use listing::HttpListingSource;
pub use listing::ListingPayload;
pub use resource::HttpResourceLoader;
pub use resource::LoadedImage;

/// Builds the shared HTTP client. Every request carries the kiosk user agent
/// and is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .build()
}

pub fn user_agent() -> String {
    format!("kiosk/{}", env!("CARGO_PKG_VERSION"))
}
