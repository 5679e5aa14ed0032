//! Hub bridge daemon: connects to every configured hub and mirrors their
//! device registries, logging accessory activity.

mod config;
mod host;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use homelink_bridge::Bridge;

use crate::config::DaemonConfig;
use crate::host::LoggingAccessoryHost;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,homelink=debug")),
        )
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    let config = DaemonConfig::load(&config_path)?;
    info!(config = %config_path.display(), hubs = config.hubs.len(), "starting");

    let bridge = Bridge::start(config.hubs, Arc::new(LoggingAccessoryHost));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received");
    bridge.shutdown().await;
    Ok(())
}
