//! oscquery - serve and browse OSCQuery namespaces from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod browse;
mod serve;

/// OSCQuery namespace publishing and discovery
#[derive(Parser)]
#[command(name = "oscquery")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a namespace over HTTP and mDNS
    Serve {
        /// TOML file with server settings and [[method]] entries
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Service name
        #[arg(short, long)]
        name: Option<String>,

        /// Address reported for the OSC endpoint
        #[arg(long)]
        osc_ip: Option<IpAddr>,

        /// OSC endpoint port
        #[arg(long, env = "OSCQUERY_OSC_PORT")]
        osc_port: Option<u16>,

        /// HTTP port (default: pick a free one)
        #[arg(long)]
        http_port: Option<u16>,

        /// Do not advertise over mDNS
        #[arg(long)]
        no_mdns: bool,
    },

    /// Watch the network for OSCQuery services
    Browse {
        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Query one service directly
    Get {
        /// Host address
        address: String,

        /// HTTP port
        port: u16,

        /// Node path (default: list all methods)
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(()).await;
        }
    });

    match cli.command {
        Commands::Serve {
            config,
            name,
            osc_ip,
            osc_port,
            http_port,
            no_mdns,
        } => {
            let mut file = match config {
                Some(path) => serve::ServeFile::load(&path)?,
                None => serve::ServeFile::default(),
            };
            file.apply_overrides(serve::Overrides {
                name,
                osc_ip,
                osc_port,
                http_port,
                no_mdns,
            });
            serve::run_serve(file, &mut shutdown_rx).await?;
        }

        Commands::Browse { duration } => {
            browse::run_browse(duration, &mut shutdown_rx).await?;
        }

        Commands::Get {
            address,
            port,
            path,
        } => {
            browse::run_get(&address, port, path.as_deref()).await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}
