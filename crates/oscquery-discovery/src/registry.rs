//! Live list of discovered services
//!
//! The mDNS browser feeds advertisements in through [`ServiceRegistry::service_up`]
//! and [`ServiceRegistry::service_down`]; each candidate address is queried
//! independently so one unresponsive host never holds up the others.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{DiscoveredService, DiscoveryConfig, DiscoveryError, Result};

/// One mDNS advertisement, as seen by the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// mDNS instance fullname, the key removals arrive with
    pub fullname: String,
    /// Service type, e.g. `_oscjson._tcp.local.`
    pub service_type: String,
    pub port: u16,
    pub addresses: Vec<String>,
}

impl Advertisement {
    pub fn is_tcp(&self) -> bool {
        self.service_type.contains("._tcp")
    }
}

/// Discovery events
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A service was fetched and added to the live list
    Up(Arc<DiscoveredService>),
    /// A live service's advertisement went away
    Down(Arc<DiscoveredService>),
    /// A candidate could not be loaded
    Error {
        address: String,
        port: u16,
        unreachable: bool,
        message: String,
    },
}

#[derive(Default)]
struct RegistryState {
    live: Vec<Arc<DiscoveredService>>,
    in_flight: HashSet<(String, u16)>,
    /// Endpoints announced under each fullname, across re-resolutions
    advertised: HashMap<String, HashSet<(String, u16)>>,
}

/// Releases an in-flight slot when the query finishes or is dropped
struct InFlightGuard<'a> {
    state: &'a Mutex<RegistryState>,
    key: (String, u16),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(&self.key);
    }
}

/// Deduplicated set of live services keyed by `(address, port)`
pub struct ServiceRegistry {
    client: reqwest::Client,
    state: Mutex<RegistryState>,
    events: broadcast::Sender<DiscoveryEvent>,
}

impl ServiceRegistry {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Ok(Self {
            client: config.http_client()?,
            state: Mutex::new(RegistryState::default()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the live list
    pub fn services(&self) -> Vec<Arc<DiscoveredService>> {
        self.state.lock().live.clone()
    }

    pub fn get(&self, address: &str, port: u16) -> Option<Arc<DiscoveredService>> {
        self.state
            .lock()
            .live
            .iter()
            .find(|s| s.address() == address && s.port() == port)
            .cloned()
    }

    /// Validate, fetch and add one endpoint.
    ///
    /// An endpoint that is already live is returned as is, without a new
    /// event. A concurrent query for the same endpoint fails with
    /// [`DiscoveryError::InFlight`].
    pub async fn query_new_service(
        &self,
        address: &str,
        port: u16,
    ) -> Result<Arc<DiscoveredService>> {
        self.query_endpoint(address, port, None).await
    }

    /// When `fullname` is set, the result is only kept if that advertisement
    /// still lists the endpoint once the fetch completes.
    async fn query_endpoint(
        &self,
        address: &str,
        port: u16,
        fullname: Option<&str>,
    ) -> Result<Arc<DiscoveredService>> {
        let mut service = DiscoveredService::new(address, port)?;
        let key = (service.address().to_string(), port);

        {
            let mut state = self.state.lock();
            if let Some(existing) = state
                .live
                .iter()
                .find(|s| s.address() == key.0 && s.port() == port)
            {
                return Ok(existing.clone());
            }
            if !state.in_flight.insert(key.clone()) {
                return Err(DiscoveryError::InFlight {
                    address: key.0,
                    port,
                });
            }
        }
        let guard = InFlightGuard {
            state: &self.state,
            key,
        };

        if let Err(e) = service.update(&self.client).await {
            drop(guard);
            self.report(service.address(), port, &e);
            return Err(e);
        }

        let service = Arc::new(service);
        let withdrawn = {
            let mut state = self.state.lock();
            let withdrawn = fullname.is_some_and(|name| {
                !state
                    .advertised
                    .get(name)
                    .is_some_and(|endpoints| endpoints.contains(&guard.key))
            });
            if !withdrawn {
                state.live.push(service.clone());
            }
            withdrawn
        };
        // the guard takes the state lock itself
        drop(guard);

        if withdrawn {
            debug!(
                "Discarding {}:{}, advertisement withdrawn during query",
                service.address(),
                port
            );
            return Err(DiscoveryError::Withdrawn {
                address: service.address().to_string(),
                port,
            });
        }

        let name = service
            .host_info()
            .map(|info| info.name.as_str())
            .unwrap_or_default();
        info!(
            "Discovered OSCQuery service '{}' at {}:{}",
            name,
            service.address(),
            port
        );
        let _ = self.events.send(DiscoveryEvent::Up(service.clone()));
        Ok(service)
    }

    /// Handle an advertisement: query every usable address concurrently.
    /// Returns the services that are live afterwards.
    pub async fn service_up(&self, advertisement: Advertisement) -> Vec<Arc<DiscoveredService>> {
        if !advertisement.is_tcp() {
            debug!("Ignoring non-TCP service {}", advertisement.fullname);
            return Vec::new();
        }

        let addresses: Vec<String> = advertisement
            .addresses
            .iter()
            .map(|a| a.trim())
            .filter(|a| usable_address(a))
            .map(str::to_string)
            .collect();
        if addresses.is_empty() {
            debug!("No usable address for {}", advertisement.fullname);
        }

        // a re-resolution adds to what the fullname already covers
        self.state
            .lock()
            .advertised
            .entry(advertisement.fullname.clone())
            .or_default()
            .extend(addresses.iter().map(|a| (a.clone(), advertisement.port)));

        let fullname = advertisement.fullname.as_str();
        let queries = addresses
            .iter()
            .map(|address| self.query_endpoint(address, advertisement.port, Some(fullname)));
        join_all(queries)
            .await
            .into_iter()
            .filter_map(|result| result.ok())
            .collect()
    }

    /// Handle a removal: drop every live service the advertisement pointed at
    pub fn service_down(&self, fullname: &str) -> Vec<Arc<DiscoveredService>> {
        let removed = {
            let mut state = self.state.lock();
            let Some(endpoints) = state.advertised.remove(fullname) else {
                debug!("Removal for unknown service {}", fullname);
                return Vec::new();
            };

            let mut removed = Vec::new();
            state.live.retain(|service| {
                let gone = endpoints
                    .iter()
                    .any(|(address, port)| *port == service.port() && address == service.address());
                if gone {
                    removed.push(service.clone());
                }
                !gone
            });
            removed
        };

        for service in &removed {
            info!(
                "OSCQuery service at {}:{} went away",
                service.address(),
                service.port()
            );
            let _ = self.events.send(DiscoveryEvent::Down(service.clone()));
        }
        removed
    }

    fn report(&self, address: &str, port: u16, err: &DiscoveryError) {
        let unreachable = err.is_unreachable();
        if unreachable {
            warn!("OSCQuery candidate {}:{} unreachable: {}", address, port, err);
        } else {
            error!("OSCQuery candidate {}:{} failed: {}", address, port, err);
        }
        let _ = self.events.send(DiscoveryEvent::Error {
            address: address.to_string(),
            port,
            unreachable,
            message: err.to_string(),
        });
    }
}

/// Empty addresses and the IPv6 loopback are never queried
fn usable_address(address: &str) -> bool {
    if address.is_empty() {
        return false;
    }
    !matches!(
        address.parse::<IpAddr>(),
        Ok(IpAddr::V6(ip)) if ip == Ipv6Addr::LOCALHOST
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_address() {
        assert!(usable_address("192.168.1.5"));
        assert!(usable_address("fe80::1"));
        assert!(usable_address("studio.local"));
        assert!(!usable_address(""));
        assert!(!usable_address("::1"));
        assert!(!usable_address("0:0:0:0:0:0:0:1"));
    }

    #[test]
    fn test_is_tcp() {
        let mut ad = Advertisement {
            fullname: "x._oscjson._tcp.local.".to_string(),
            service_type: "_oscjson._tcp.local.".to_string(),
            port: 1,
            addresses: vec![],
        };
        assert!(ad.is_tcp());
        ad.service_type = "_oscjson._udp.local.".to_string();
        assert!(!ad.is_tcp());
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_io() {
        let registry = ServiceRegistry::new(&DiscoveryConfig::default()).unwrap();
        let mut events = registry.subscribe();

        assert!(matches!(
            registry.query_new_service("", 9000).await,
            Err(DiscoveryError::InvalidAddress(_))
        ));
        assert!(matches!(
            registry.query_new_service("127.0.0.1", 0).await,
            Err(DiscoveryError::InvalidPort(0))
        ));
        assert!(events.try_recv().is_err());
        assert!(registry.state.lock().in_flight.is_empty());
    }

    #[test]
    fn test_unknown_removal_is_silent() {
        let registry = ServiceRegistry::new(&DiscoveryConfig::default()).unwrap();
        let mut events = registry.subscribe();
        assert!(registry.service_down("nobody._oscjson._tcp.local.").is_empty());
        assert!(events.try_recv().is_err());
    }
}
