//! Discovery configuration

use oscquery_core::SERVICE_TYPE;
use std::time::Duration;

use crate::{DiscoveryError, Result};

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// mDNS service type to browse
    pub service_type: String,
    /// Timeout for each HTTP request to a candidate service
    pub request_timeout: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_string(),
            request_timeout: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}

impl DiscoveryConfig {
    /// HTTP client with the configured per-request timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| DiscoveryError::Client(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_builds() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.http_client().is_ok());
    }
}
