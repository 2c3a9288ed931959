//! OSCQuery Discovery
//!
//! Browses mDNS for `_oscjson._tcp` services, fetches each candidate's tree
//! and host info over HTTP, and keeps a deduplicated live list:
//!
//! - [`Discovery`] owns the mDNS browser
//! - [`ServiceRegistry`] holds the live list and emits [`DiscoveryEvent`]s
//! - [`DiscoveredService`] is one peer with its fetched namespace

pub mod config;
pub mod error;
pub mod registry;
pub mod service;

#[cfg(feature = "mdns")]
mod mdns;

pub use config::DiscoveryConfig;
pub use error::{DiscoveryError, Result};
pub use registry::{Advertisement, DiscoveryEvent, ServiceRegistry};
pub use service::DiscoveredService;

#[cfg(feature = "mdns")]
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Discover OSCQuery services on the local network
pub struct Discovery {
    config: DiscoveryConfig,
    registry: Arc<ServiceRegistry>,
    #[cfg(feature = "mdns")]
    browser: Mutex<Option<mdns::Browser>>,
}

impl Discovery {
    pub fn new() -> Result<Self> {
        Self::with_config(DiscoveryConfig::default())
    }

    pub fn with_config(config: DiscoveryConfig) -> Result<Self> {
        let registry = Arc::new(ServiceRegistry::new(&config)?);
        Ok(Self {
            config,
            registry,
            #[cfg(feature = "mdns")]
            browser: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.registry.subscribe()
    }

    /// Snapshot of the live services
    pub fn services(&self) -> Vec<Arc<DiscoveredService>> {
        self.registry.services()
    }

    /// Query one endpoint directly, bypassing mDNS
    pub async fn query_new_service(
        &self,
        address: &str,
        port: u16,
    ) -> Result<Arc<DiscoveredService>> {
        self.registry.query_new_service(address, port).await
    }

    /// Start browsing. No-op if already browsing.
    #[cfg(feature = "mdns")]
    pub fn start(&self) -> Result<()> {
        let mut browser = self.browser.lock();
        if browser.is_none() {
            *browser = Some(mdns::Browser::start(
                &self.config.service_type,
                self.registry.clone(),
            )?);
        }
        Ok(())
    }

    /// Stop browsing. No-op if not browsing. Live services are kept.
    #[cfg(feature = "mdns")]
    pub fn stop(&self) -> Result<()> {
        let browser = self.browser.lock().take();
        match browser {
            Some(browser) => browser.stop(),
            None => Ok(()),
        }
    }

    #[cfg(feature = "mdns")]
    pub fn is_running(&self) -> bool {
        self.browser.lock().is_some()
    }
}

#[cfg(feature = "mdns")]
impl Drop for Discovery {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
