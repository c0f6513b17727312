//! Layered configuration: defaults, `PocDeploy.toml`, then `POCDEPLOY_*` environment.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "PocDeploy.toml";

/// Prefix of the environment variables merged over the file.
pub const ENV_PREFIX: &str = "POCDEPLOY_";

/// The network used when none is selected.
pub const DEFAULT_NETWORK: &str = "localhost";

/// Connection settings of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the node.
    pub url: Url,
    /// Account to deploy from. Defaults to the node's first account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Address>,
}

impl NetworkConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            deployer: None,
        }
    }
}

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// The network selected when the CLI doesn't name one.
    pub default_network: String,
    /// Root of the per-network record directories.
    pub deployments_dir: PathBuf,
    /// Directory holding the compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// How long to wait for a deployment transaction to be mined.
    pub receipt_timeout_secs: u64,
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            DEFAULT_NETWORK.to_string(),
            NetworkConfig::new(
                Url::parse("http://127.0.0.1:8545").expect("static URL is valid"),
            ),
        );

        Self {
            default_network: DEFAULT_NETWORK.to_string(),
            deployments_dir: PathBuf::from("deployments"),
            artifacts_dir: PathBuf::from("artifacts"),
            receipt_timeout_secs: 120,
            networks,
        }
    }
}

impl DeployConfig {
    /// Build the configuration from defaults, the TOML file at `path` (if it
    /// exists) and `POCDEPLOY_*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
        let path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path
        };

        if path.exists() {
            tracing::debug!(path = %path.display(), "Merging configuration file");
            figment = figment.merge(Toml::file(&path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration (file: {})", path.display()))?;

        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Settings of the network named `name`.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks.get(name).with_context(|| {
            format!(
                "Unknown network {}; configured networks: {}",
                name,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}
