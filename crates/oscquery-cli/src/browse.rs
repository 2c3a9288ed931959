//! `oscquery browse` and `oscquery get`

use anyhow::{Context, Result};
use colored::Colorize;
use oscquery_core::{format_type_string, NodeRef};
use oscquery_discovery::{DiscoveredService, Discovery, DiscoveryConfig, DiscoveryEvent};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

pub async fn run_browse(duration: Option<u64>, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
    let discovery = Discovery::new().context("Failed to create discovery")?;
    let mut events = discovery.subscribe();
    discovery.start().context("Failed to start mDNS browse")?;

    println!(
        "{} Browsing for {}",
        "OSCQuery".cyan().bold(),
        discovery.config().service_type
    );

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(DiscoveryEvent::Up(service)) => {
                    println!("{} {}", "UP".green().bold(), describe_service(&service));
                    print_methods(&service);
                }
                Ok(DiscoveryEvent::Down(service)) => {
                    println!("{} {}", "DOWN".red().bold(), describe_service(&service));
                }
                Ok(DiscoveryEvent::Error { address, port, unreachable, message }) => {
                    let label = if unreachable { "SKIP".dimmed() } else { "ERROR".yellow().bold() };
                    println!("{} {}:{} {}", label, address, port, message);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} discovery events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    discovery.stop().context("Failed to stop mDNS browse")?;
    println!("{} services seen live at exit", discovery.services().len());
    Ok(())
}

pub async fn run_get(address: &str, port: u16, path: Option<&str>) -> Result<()> {
    let mut service = DiscoveredService::new(address, port)?;
    let client = DiscoveryConfig::default().http_client()?;
    service
        .update(&client)
        .await
        .with_context(|| format!("Failed to query {}", service.base_url()))?;

    println!("{}", describe_service(&service));

    match path {
        Some(path) => match service.resolve_path(path)? {
            Some(node) => {
                let description = node.describe().unwrap_or_default();
                println!("{}", serde_json::to_string_pretty(&description)?);
            }
            None => println!("{} {}", "No node at".red(), path),
        },
        None => print_methods(&service),
    }
    Ok(())
}

fn describe_service(service: &DiscoveredService) -> String {
    let name = service
        .host_info()
        .map(|info| info.name.clone())
        .unwrap_or_else(|_| "?".to_string());
    format!("'{}' at {}", name.green(), service.base_url())
}

fn print_methods(service: &DiscoveredService) {
    let Ok(methods) = service.methods() else {
        return;
    };
    for method in methods {
        println!("  {}", format_method(&method));
    }
}

fn format_method(method: &NodeRef<'_>) -> String {
    let types: Vec<_> = method
        .arguments()
        .unwrap_or_default()
        .iter()
        .map(|arg| arg.ty.clone())
        .collect();
    let access = method
        .access()
        .map(|a| a.code().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<40} {:<8} access={}",
        method.full_path().yellow(),
        format_type_string(&types),
        access
    )
}
