//! Query server configuration

use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;

use oscquery_core::{Extensions, HostInfo, OscTransport};

use crate::{Result, ServerError};

/// Query server configuration
#[derive(Debug, Clone)]
pub struct QueryServerConfig {
    /// Service name, used for `HOST_INFO` and the mDNS instance name
    pub name: String,
    /// Interface the HTTP listener binds to
    pub http_ip: IpAddr,
    /// Fixed HTTP port; `None` (or `Some(0)`) selects one automatically
    pub http_port: Option<u16>,
    /// Ports tried in order when selecting automatically. `None` leaves the
    /// choice to the OS ephemeral range.
    pub port_range: Option<RangeInclusive<u16>>,
    /// Address reported for the OSC endpoint
    pub osc_ip: IpAddr,
    /// OSC endpoint port. Required.
    pub osc_port: Option<u16>,
    pub osc_transport: OscTransport,
    /// Attributes reported as supported in `HOST_INFO`
    pub extensions: Extensions,
    /// Advertise the service over mDNS
    pub advertise: bool,
}

impl Default for QueryServerConfig {
    fn default() -> Self {
        Self {
            name: "OSCQuery Server".to_string(),
            http_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: None,
            port_range: None,
            osc_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            osc_port: None,
            osc_transport: OscTransport::Udp,
            extensions: Extensions::all(),
            advertise: true,
        }
    }
}

impl QueryServerConfig {
    /// Check required fields and build the `HOST_INFO` document
    pub fn host_info(&self) -> Result<HostInfo> {
        let osc_port = match self.osc_port {
            Some(port) if port != 0 => port,
            _ => return Err(ServerError::Config("osc_port is required".to_string())),
        };
        if self.name.is_empty() {
            return Err(ServerError::Config("name must not be empty".to_string()));
        }
        if let Some(range) = &self.port_range {
            if range.is_empty() || *range.start() == 0 {
                return Err(ServerError::Config(format!(
                    "invalid port range {}-{}",
                    range.start(),
                    range.end()
                )));
            }
        }

        Ok(HostInfo {
            name: self.name.clone(),
            extensions: self.extensions,
            osc_ip: self.osc_ip.to_string(),
            osc_port,
            osc_transport: self.osc_transport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc_port_required() {
        let config = QueryServerConfig::default();
        assert!(matches!(config.host_info(), Err(ServerError::Config(_))));

        let config = QueryServerConfig {
            osc_port: Some(0),
            ..Default::default()
        };
        assert!(config.host_info().is_err());
    }

    #[test]
    fn test_host_info_from_config() {
        let config = QueryServerConfig {
            name: "Rig".to_string(),
            osc_port: Some(9001),
            ..Default::default()
        };
        let info = config.host_info().unwrap();
        assert_eq!(info.name, "Rig");
        assert_eq!(info.osc_ip, "127.0.0.1");
        assert_eq!(info.osc_port, 9001);
        assert_eq!(info.osc_transport, OscTransport::Udp);
        assert_eq!(info.extensions, Extensions::all());
    }

    #[test]
    fn test_bad_port_range() {
        let config = QueryServerConfig {
            osc_port: Some(9000),
            port_range: Some(0..=10),
            ..Default::default()
        };
        assert!(config.host_info().is_err());
    }
}
