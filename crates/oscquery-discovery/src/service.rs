//! A peer OSCQuery service and its fetched namespace

use oscquery_core::{HostInfo, Methods, NodeDescription, NodeRef, NodeTree};
use serde::de::DeserializeOwned;
use std::net::IpAddr;

use crate::{DiscoveryError, Result};

/// A peer endpoint. The host info and tree are empty until [`update`]
/// succeeds; accessors return [`DiscoveryError::NotLoaded`] before that.
///
/// [`update`]: DiscoveredService::update
#[derive(Debug, Clone)]
pub struct DiscoveredService {
    address: String,
    port: u16,
    host_info: Option<HostInfo>,
    nodes: Option<NodeTree>,
}

impl DiscoveredService {
    /// Validate the endpoint. No I/O happens here.
    pub fn new(address: &str, port: u16) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() || address.contains(char::is_whitespace) {
            return Err(DiscoveryError::InvalidAddress(address.to_string()));
        }
        if port == 0 {
            return Err(DiscoveryError::InvalidPort(port));
        }
        Ok(Self {
            address: address.to_string(),
            port,
            host_info: None,
            nodes: None,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port`, with IPv6 literals in brackets
    pub fn base_url(&self) -> String {
        match self.address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("http://[{}]:{}", ip, self.port),
            _ => format!("http://{}:{}", self.address, self.port),
        }
    }

    /// Fetch the full tree and the host info concurrently. Both must succeed.
    pub async fn update(&mut self, client: &reqwest::Client) -> Result<()> {
        let base = self.base_url();
        let tree_url = format!("{}/", base);
        let host_info_url = format!("{}/?HOST_INFO", base);

        let (description, host_info) = tokio::try_join!(
            fetch::<NodeDescription>(client, &tree_url),
            fetch::<HostInfo>(client, &host_info_url)
        )?;

        self.nodes = Some(NodeTree::from_description(&description));
        self.host_info = Some(host_info);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.nodes.is_some() && self.host_info.is_some()
    }

    pub fn host_info(&self) -> Result<&HostInfo> {
        self.host_info
            .as_ref()
            .ok_or(DiscoveryError::NotLoaded("host info"))
    }

    pub fn nodes(&self) -> Result<&NodeTree> {
        self.nodes.as_ref().ok_or(DiscoveryError::NotLoaded("nodes"))
    }

    /// Look up a node by path. `Ok(None)` means the peer has no such node.
    pub fn resolve_path(&self, path: &str) -> Result<Option<NodeRef<'_>>> {
        Ok(self.nodes()?.resolve(path))
    }

    /// Every method in the peer tree, depth first
    pub fn methods(&self) -> Result<Methods<'_>> {
        let nodes = self.nodes()?;
        Ok(nodes.methods(nodes.root()))
    }
}

async fn fetch<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DiscoveryError::from_request(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| DiscoveryError::from_request(url, e))?;
    serde_json::from_slice(&body).map_err(|e| DiscoveryError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
