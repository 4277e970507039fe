// src/main.rs
//! Approval wallet server entry point.
use anyhow::{Context, Result};
use approval_wallet::api::server::WalletServer;
use approval_wallet::core::config::WalletConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "approval_wallet")]
#[command(about = "Signed-approval wallet server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML configuration file (falls back to CONFIG_PATH, then config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    info!("Starting approval wallet v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!(
        "Approvals expire after {}s (clock skew tolerance {}s)",
        config.approvals.ttl_secs, config.approvals.clock_skew_tolerance_secs
    );

    let server = WalletServer::new(config).context("initialize server")?;
    server.start().await
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// An explicit path must exist; the implicit default may be absent.
fn load_config(explicit: Option<PathBuf>) -> Result<WalletConfig> {
    if let Some(path) = explicit {
        return WalletConfig::load(&path)
            .with_context(|| format!("load config from {}", path.display()));
    }
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !std::path::Path::new(&path).exists() {
        warn!("{} not found. Using default configuration", path);
        return Ok(WalletConfig::default());
    }
    let config = WalletConfig::load(&path).with_context(|| format!("load config from {}", path))?;
    info!("Loaded configuration from {}", path);
    Ok(config)
}
