//! Project configuration: target networks, credentials and paths.
//!
//! Configuration is layered with figment: built-in defaults, then `Stakeup.toml`, then
//! `STAKEUP_`-prefixed environment variables (nested keys separated by `__`, e.g.
//! `STAKEUP_NETWORKS__LOCAL__URL`).

use std::{collections::BTreeMap, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// The default name for the stakeup configuration file.
pub const CONFIG_FILENAME: &str = "Stakeup.toml";

/// Environment variable holding the deployer private key.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Solidity compiler version the contracts are built with.
pub const DEFAULT_SOLIDITY_VERSION: &str = "0.8.28";

/// Networks known without any configuration file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum NetworkPreset {
    BaseSepolia,
    Local,
}

impl NetworkPreset {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkPreset::BaseSepolia => 84532,
            NetworkPreset::Local => 31337,
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            NetworkPreset::BaseSepolia => "https://sepolia.base.org",
            NetworkPreset::Local => "http://127.0.0.1:8545",
        }
    }

    pub fn config(&self) -> NetworkConfig {
        NetworkConfig {
            url: Url::parse(self.rpc_url()).expect("preset RPC URLs are valid"),
            chain_id: self.chain_id(),
            accounts: Vec::new(),
        }
    }
}

/// Connection details for one target network.
///
/// The endpoint and credentials are handed to whatever executes the plan; stakeup itself
/// only uses the chain ID and the deployer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub url: Url,
    /// Chain ID, also used to name the default deployment.
    pub chain_id: u64,
    /// Hex-encoded private keys. The first one is the deployer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
}

impl NetworkConfig {
    /// The deployer private key, if any is configured.
    pub fn deployer_key(&self) -> Option<&str> {
        self.accounts.first().map(String::as_str)
    }
}

/// Paths used by stakeup, relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory containing compiled contract artifacts.
    pub artifacts: PathBuf,
    /// Directory where deployment journals are stored.
    pub deployments: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("artifacts"),
            deployments: PathBuf::from("deployments"),
        }
    }
}

/// Top-level project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeupConfig {
    /// Solidity compiler version the artifacts were produced with.
    pub solidity: String,
    /// Network name to use when none is given on the command line.
    pub default_network: String,
    /// Target networks by name.
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for StakeupConfig {
    fn default() -> Self {
        use strum::IntoEnumIterator;

        Self {
            solidity: DEFAULT_SOLIDITY_VERSION.to_string(),
            default_network: NetworkPreset::Local.to_string(),
            networks: NetworkPreset::iter()
                .map(|preset| (preset.to_string(), preset.config()))
                .collect(),
            paths: PathsConfig::default(),
        }
    }
}

impl StakeupConfig {
    /// Build the figment for a configuration file, without reading the process environment
    /// for credentials.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(StakeupConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("STAKEUP_").split("__"))
    }

    /// Load the configuration from `path` (a file or a directory containing
    /// [`CONFIG_FILENAME`]), layered over the defaults and the environment.
    ///
    /// A missing file is not an error: the defaults and environment are used alone. Networks
    /// without accounts get the key from the `PRIVATE_KEY` environment variable, if set.
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let mut config: Self = Self::figment(&config_path)
            .extract()
            .context(format!(
                "Failed to load configuration from {}",
                config_path.display()
            ))?;

        if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
            config.apply_private_key(&key);
        }

        tracing::debug!(
            path = %config_path.display(),
            networks = ?config.networks.keys().collect::<Vec<_>>(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Use `key` as the deployer for every network that has no account configured.
    pub fn apply_private_key(&mut self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        for network in self.networks.values_mut() {
            if network.accounts.is_empty() {
                network.accounts.push(key.to_string());
            }
        }
    }

    /// Look up a network by name.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks.get(name).with_context(|| {
            format!(
                "Unknown network '{}'. Available networks: {}",
                name,
                self.networks
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}
