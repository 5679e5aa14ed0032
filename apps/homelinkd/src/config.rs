//! Daemon configuration: a TOML file with one `[[hubs]]` block per hub.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use homelink_hub_client::HubConfig;

#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub hubs: Vec<HubConfig>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        if config.hubs.is_empty() {
            anyhow::bail!("no hubs configured in {}", path.display());
        }
        Ok(config)
    }
}

/// Default config location: `$XDG_CONFIG_HOME/homelink/config.toml` (or
/// the platform equivalent), overridable by the first CLI argument.
pub fn default_config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                let mut p = PathBuf::from(home);
                p.push(".config");
                p
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("homelink").join("config.toml")
}
