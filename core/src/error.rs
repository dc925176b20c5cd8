use std::path::PathBuf;

use thiserror::Error;

/// Failures while fetching or reading the listing endpoint.
///
/// None of these are fatal: the poller logs them and waits for the next
/// cadence tick.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Endpoint unreachable, connection reset, timeout.
    #[error("listing request failed: {0}")]
    Fetch(String),

    /// Endpoint answered with a non-2xx status.
    #[error("listing endpoint returned status {status}")]
    Status { status: u16 },

    /// Body was not `{ "files": [string, ...] }`.
    #[error("malformed listing payload: {0}")]
    MalformedPayload(String),
}

impl FeedError {
    /// A malformed payload is indistinguishable from "nothing new" and is
    /// logged quieter than transport failures.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedPayload(_))
    }
}

/// Failures while loading a single image resource.
///
/// The readiness coordinator absorbs these into a degraded-but-available
/// report; they never reach the presentation as errors.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("resource request failed: {0}")]
    Fetch(String),

    #[error("resource returned status {status}")]
    Status { status: u16 },

    #[error("resource could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
