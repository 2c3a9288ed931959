//! mDNS advertisement of the query endpoint

use mdns_sd::{ServiceDaemon, ServiceInfo};
use oscquery_core::SERVICE_TYPE;
use tracing::{debug, info};

use crate::{Result, ServerError};

/// Advertises one OSCQuery HTTP endpoint as `_oscjson._tcp`
pub struct ServiceAdvertiser {
    mdns: ServiceDaemon,
    fullname: Option<String>,
}

impl ServiceAdvertiser {
    pub fn new() -> Result<Self> {
        let mdns = ServiceDaemon::new().map_err(|e| ServerError::Mdns(e.to_string()))?;
        Ok(Self {
            mdns,
            fullname: None,
        })
    }

    /// Register `name` on `port`, addresses filled in from the local interfaces
    pub fn advertise(&mut self, name: &str, port: u16) -> Result<()> {
        let host = hostname::get()
            .map_err(|e| ServerError::Mdns(format!("cannot read hostname: {}", e)))?;
        let host = format!("{}.local.", host.to_string_lossy());

        let properties: &[(&str, &str)] = &[("txtvers", "1")];
        let service_info = ServiceInfo::new(SERVICE_TYPE, name, &host, "", port, properties)
            .map_err(|e| ServerError::Mdns(e.to_string()))?
            .enable_addr_auto();

        let fullname = service_info.get_fullname().to_string();
        self.mdns
            .register(service_info)
            .map_err(|e| ServerError::Mdns(e.to_string()))?;
        self.fullname = Some(fullname);

        info!("Advertising OSCQuery service: {} on port {}", name, port);
        Ok(())
    }

    /// Withdraw the advertisement. No-op if nothing is registered.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(fullname) = self.fullname.take() {
            self.mdns
                .unregister(&fullname)
                .map_err(|e| ServerError::Mdns(e.to_string()))?;
            debug!("Withdrew mDNS advertisement {}", fullname);
        }
        Ok(())
    }
}

impl Drop for ServiceAdvertiser {
    fn drop(&mut self) {
        let _ = self.stop();
        let _ = self.mdns.shutdown();
    }
}
