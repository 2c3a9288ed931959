//! mDNS browsing for OSCQuery services

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{Advertisement, DiscoveryError, Result, ServiceRegistry};

/// A running browse. The event loop ends once the daemon shuts down.
pub(crate) struct Browser {
    mdns: ServiceDaemon,
    service_type: String,
}

impl Browser {
    /// Start browsing `service_type`, feeding events into `registry`.
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(service_type: &str, registry: Arc<ServiceRegistry>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| DiscoveryError::Mdns(e.to_string()))?;
        let mdns = ServiceDaemon::new().map_err(|e| DiscoveryError::Mdns(e.to_string()))?;
        let receiver = mdns
            .browse(service_type)
            .map_err(|e| DiscoveryError::Mdns(e.to_string()))?;

        info!("Starting mDNS discovery for {}", service_type);

        let events_runtime = runtime.clone();
        runtime.spawn_blocking(move || {
            while let Ok(event) = receiver.recv() {
                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        debug!("mDNS resolved: {}", info.get_fullname());
                        let advertisement = advertisement(&info);
                        let registry = registry.clone();
                        events_runtime.spawn(async move {
                            registry.service_up(advertisement).await;
                        });
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => {
                        debug!("mDNS removed: {}", fullname);
                        registry.service_down(&fullname);
                    }
                    ServiceEvent::SearchStarted(_) => {
                        debug!("mDNS search started");
                    }
                    ServiceEvent::SearchStopped(_) => {
                        debug!("mDNS search stopped");
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            mdns,
            service_type: service_type.to_string(),
        })
    }

    pub(crate) fn stop(self) -> Result<()> {
        if let Err(e) = self.mdns.stop_browse(&self.service_type) {
            warn!("Failed to stop mDNS browse: {}", e);
        }
        self.mdns
            .shutdown()
            .map_err(|e| DiscoveryError::Mdns(e.to_string()))?;
        info!("Stopped mDNS discovery for {}", self.service_type);
        Ok(())
    }
}

fn advertisement(info: &ServiceInfo) -> Advertisement {
    Advertisement {
        fullname: info.get_fullname().to_string(),
        service_type: info.get_type().to_string(),
        port: info.get_port(),
        addresses: info.get_addresses().iter().map(|a| a.to_string()).collect(),
    }
}
