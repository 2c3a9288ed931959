//! `oscquery serve`

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use oscquery_core::{parse_type_string, Access, MethodOptions, OscTransport, OscValue};
use oscquery_server::{QueryServer, QueryServerConfig, ServerEvent};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Settings file for `serve`
///
/// ```toml
/// name = "Rig"
/// osc_port = 9000
///
/// [[method]]
/// path = "/avatar/parameters/Foo"
/// type = "i"
/// access = "rw"
/// value = [5]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeFile {
    pub name: Option<String>,
    pub osc_ip: Option<IpAddr>,
    pub osc_port: Option<u16>,
    pub osc_transport: Option<OscTransport>,
    pub http_ip: Option<IpAddr>,
    pub http_port: Option<u16>,
    pub mdns: Option<bool>,
    #[serde(rename = "method")]
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodEntry {
    pub path: String,
    #[serde(rename = "type", default)]
    pub type_string: String,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Vec<toml::Value>,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub name: Option<String>,
    pub osc_ip: Option<IpAddr>,
    pub osc_port: Option<u16>,
    pub http_port: Option<u16>,
    pub no_mdns: bool,
}

impl ServeFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if overrides.name.is_some() {
            self.name = overrides.name;
        }
        if overrides.osc_ip.is_some() {
            self.osc_ip = overrides.osc_ip;
        }
        if overrides.osc_port.is_some() {
            self.osc_port = overrides.osc_port;
        }
        if overrides.http_port.is_some() {
            self.http_port = overrides.http_port;
        }
        if overrides.no_mdns {
            self.mdns = Some(false);
        }
    }

    pub fn server_config(&self) -> QueryServerConfig {
        let defaults = QueryServerConfig::default();
        QueryServerConfig {
            name: self.name.clone().unwrap_or(defaults.name),
            osc_ip: self.osc_ip.unwrap_or(defaults.osc_ip),
            osc_port: self.osc_port,
            osc_transport: self.osc_transport.unwrap_or(defaults.osc_transport),
            http_ip: self.http_ip.unwrap_or(defaults.http_ip),
            http_port: self.http_port,
            advertise: self.mdns.unwrap_or(defaults.advertise),
            ..defaults
        }
    }

    /// Create the server and load every `[[method]]` into its tree
    pub fn build(&self) -> Result<QueryServer> {
        let server = QueryServer::new(self.server_config()).context("Invalid server settings")?;
        for method in &self.methods {
            method
                .install(&server)
                .with_context(|| format!("Invalid method {}", method.path))?;
        }
        Ok(server)
    }
}

impl MethodEntry {
    fn install(&self, server: &QueryServer) -> Result<()> {
        let access = match &self.access {
            Some(access) => parse_access(access)?,
            None => Access::ReadWrite,
        };
        let mut opts = MethodOptions::with_type(&self.type_string, access);
        if let Some(description) = &self.description {
            opts = opts.description(description);
        }
        server.add_method(&self.path, opts)?;

        let tokens = parse_type_string(&self.type_string);
        if self.value.len() > tokens.len() {
            bail!(
                "{} values given for type {:?}",
                self.value.len(),
                self.type_string
            );
        }
        for (index, (token, value)) in tokens.iter().zip(&self.value).enumerate() {
            let json = serde_json::to_value(value)?;
            let value = OscValue::from_json(token, &json)
                .ok_or_else(|| anyhow!("value {} does not fit type {}", value, token))?;
            server.set_value(&self.path, index, value)?;
        }
        Ok(())
    }
}

fn parse_access(text: &str) -> Result<Access> {
    let access = match text.to_ascii_lowercase().as_str() {
        "none" | "0" => Access::NoValue,
        "r" | "read" | "readonly" | "1" => Access::ReadOnly,
        "w" | "write" | "writeonly" | "2" => Access::WriteOnly,
        "rw" | "readwrite" | "3" => Access::ReadWrite,
        other => bail!("unknown access {:?}", other),
    };
    Ok(access)
}

pub async fn run_serve(file: ServeFile, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
    let server = file.build()?;
    let mut events = server.subscribe();

    let host_info = server.start().await.context("Failed to start server")?;
    let port = server.port().unwrap_or_default();

    println!(
        "{} Serving '{}' on port {}",
        "OSCQuery".cyan().bold(),
        host_info.name.green(),
        port
    );
    println!(
        "  OSC:     {}:{} ({})",
        host_info.osc_ip, host_info.osc_port, host_info.osc_transport
    );
    println!("  Methods: {}", server.with_tree(|tree| tree.methods(tree.root()).count()));
    println!(
        "  mDNS:    {}",
        if server.config().advertise { "advertised" } else { "off" }
    );
    println!("  Press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = events.recv() => match event {
                Ok(ServerEvent::FirstRequest { path }) => {
                    info!("First request received: {}", path);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} server events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    server.stop().await.context("Failed to stop server")?;
    println!("{}", "Server stopped".yellow());
    Ok(())
}
