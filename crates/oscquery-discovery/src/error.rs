//! Discovery error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid port: {0}")]
    InvalidPort(u16),

    #[error("{0} not loaded, call update() first")]
    NotLoaded(&'static str),

    #[error("already querying {address}:{port}")]
    InFlight { address: String, port: u16 },

    #[error("advertisement for {address}:{port} was withdrawn")]
    Withdrawn { address: String, port: u16 },

    #[error("service unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("mDNS error: {0}")]
    Mdns(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl DiscoveryError {
    /// Classify a reqwest failure: refused connections and timeouts are
    /// expected for hosts that advertise but do not serve
    pub(crate) fn from_request(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        let reason = err.to_string();
        if err.is_connect() || err.is_timeout() {
            DiscoveryError::Unreachable { url, reason }
        } else if err.is_decode() {
            DiscoveryError::Decode { url, reason }
        } else {
            DiscoveryError::Fetch { url, reason }
        }
    }

    /// Whether this failure is the low-severity "nobody home" case
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DiscoveryError::Unreachable { .. })
    }
}
