//! Builder module for creating a [`Deployer`] configuration.
//!
//! This module provides the [`DeployerBuilder`] struct which resolves the target network
//! from the project configuration, derives the deployer account from its private key and
//! picks the deployment directory.

use std::{path::PathBuf, str::FromStr};

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};

use crate::{Deployer, NetworkPreset, StakeupConfig};

/// Private key of the first account of local development nodes (Anvil, Hardhat).
///
/// Publicly known; only ever used for the `local` chain ID.
pub const DEV_ACCOUNT_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Derive the account address of a hex-encoded private key.
pub fn address_from_private_key(key: &str) -> Result<Address> {
    let signer = PrivateKeySigner::from_str(key.trim())
        .context("Invalid deployer private key (expected 32 hex-encoded bytes)")?;
    Ok(signer.address())
}

/// Builder for creating a [`Deployer`] configuration.
///
/// This builder handles:
/// - Network lookup in the project configuration
/// - Deployer account derivation (the dev account is used on the local chain when no key
///   is configured)
/// - Deployment ID generation (`chain-<chain id>` if not provided)
/// - Resolution of artifact and deployment paths against the project root
///
/// # Example
///
/// ```no_run
/// use stakeup_deploy::{DeployerBuilder, StakeupConfig};
///
/// # fn example() -> anyhow::Result<()> {
/// let deployer = DeployerBuilder::new("base-sepolia")
///     .config(StakeupConfig::default())
///     .private_key(std::env::var("PRIVATE_KEY")?)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeployerBuilder {
    /// The network name (required).
    network_name: String,
    /// The project configuration.
    config: StakeupConfig,
    /// The project root, against which relative paths are resolved.
    root: PathBuf,
    /// The deployment ID (optional, derived from the chain ID if not provided).
    deployment_id: Option<String>,
    /// The deployer private key (optional, overrides the configured accounts).
    private_key: Option<String>,
}

impl DeployerBuilder {
    /// Create a new [`DeployerBuilder`] targeting the named network.
    pub fn new(network_name: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
            config: StakeupConfig::default(),
            root: PathBuf::from("."),
            deployment_id: None,
            private_key: None,
        }
    }

    /// Set the project configuration.
    pub fn config(mut self, config: StakeupConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the project root directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the deployment ID.
    ///
    /// If not set, defaults to `chain-<chain id>`.
    pub fn deployment_id(mut self, id: impl Into<String>) -> Self {
        self.deployment_id = Some(id.into());
        self
    }

    /// Set the deployer private key.
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Build the [`Deployer`] configuration.
    pub fn build(self) -> Result<Deployer> {
        let network = self.config.network(&self.network_name)?.clone();

        let key = match self.private_key.as_deref().or(network.deployer_key()) {
            Some(key) => key.to_string(),
            None if network.chain_id == NetworkPreset::Local.chain_id() => {
                tracing::debug!("No deployer key configured, using the development account");
                DEV_ACCOUNT_PRIVATE_KEY.to_string()
            }
            None => anyhow::bail!(
                "No deployer account configured for network {}. Set PRIVATE_KEY or add \
                 `accounts` to the network configuration.",
                self.network_name
            ),
        };
        let deployer_address = address_from_private_key(&key)?;

        let deployment_id = self
            .deployment_id
            .unwrap_or_else(|| format!("chain-{}", network.chain_id));
        if deployment_id.is_empty()
            || deployment_id.contains(['/', '\\'])
            || deployment_id == "."
            || deployment_id == ".."
        {
            anyhow::bail!("Invalid deployment ID: {:?}", deployment_id);
        }

        let artifacts = self.root.join(&self.config.paths.artifacts);
        let deployments = self.root.join(&self.config.paths.deployments);

        tracing::info!(
            network = %self.network_name,
            chain_id = network.chain_id,
            deployment_id,
            deployer = %deployer_address,
            "Building deployer configuration..."
        );

        Ok(Deployer {
            network_name: self.network_name,
            deployment_id,
            deployer_address,
            artifacts,
            deployments,
            network,
        })
    }
}
