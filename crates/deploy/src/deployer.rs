use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    ActionId, ChainBackend, DeploymentPlan, DeploymentResult, Executor, HardhatArtifacts,
    Journal, NetworkConfig, NetworkPreset, SimulatedChain,
    journal::{ActionResult, JournalEntry},
};

/// The name of the file describing a deployment, stored in its directory.
pub const DEPLOYMENT_FILENAME: &str = "deployment.toml";

/// A deployment target: which network, which account, and where its journal lives.
///
/// This struct can be serialized to/from TOML format so that later commands (`status`,
/// `wipe`) can find the deployment again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployer {
    /// The network name, as configured.
    pub network_name: String,
    /// Identifier of the deployment, e.g. `chain-84532`.
    pub deployment_id: String,
    /// Address every action is sent from.
    pub deployer_address: Address,
    /// Directory containing compiled contract artifacts.
    pub artifacts: PathBuf,
    /// Directory holding one sub-directory per deployment.
    pub deployments: PathBuf,
    /// The network the plan is deployed to.
    pub network: NetworkConfig,
}

impl Deployer {
    /// Directory holding this deployment's journal.
    pub fn deployment_dir(&self) -> PathBuf {
        self.deployments.join(&self.deployment_id)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deployer config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Deployment configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from a deployment directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Deployment file or directory not found: {}",
                path.display()
            ));
        }

        let config_path = if path.is_dir() {
            path.join(DEPLOYMENT_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read deployment from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse deployment file as TOML")?;
        tracing::debug!(path = %config_path.display(), "Deployment configuration loaded");
        Ok(config)
    }

    /// Save the deployer's configuration to the default location (in the deployment dir).
    pub fn save_config(&self) -> Result<PathBuf> {
        let dir = self.deployment_dir();
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create deployment directory {}", dir.display()))?;

        let config_path = dir.join(DEPLOYMENT_FILENAME);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Read this deployment's journal without creating anything on disk.
    pub fn journal(&self) -> Result<Journal> {
        Journal::read(
            self.deployment_dir(),
            self.network.chain_id,
            self.deployer_address,
        )
    }

    fn open_journal(&self) -> Result<Journal> {
        Journal::open(
            self.deployment_dir(),
            self.network.chain_id,
            self.deployer_address,
        )
    }

    /// Deploy `plan` on an in-process simulated chain.
    ///
    /// Only allowed on the local development chain: anywhere else the journal would record
    /// addresses that do not exist on the network. Use [`Deployer::deploy_with`] and a
    /// backend connected to the network instead.
    ///
    /// Actions already journaled for this deployment are replayed into the simulated chain
    /// instead of being executed again. When `reset` is set, the journal is wiped first and
    /// every action runs.
    pub async fn deploy(&self, plan: &DeploymentPlan, reset: bool) -> Result<DeploymentResult> {
        let local_chain_id = NetworkPreset::Local.chain_id();
        if self.network.chain_id != local_chain_id {
            anyhow::bail!(
                "Network {} has chain ID {}; the simulated chain can only stand in for the \
                 local development chain ({}). Deploy with a backend connected to the network.",
                self.network_name,
                self.network.chain_id,
                local_chain_id
            );
        }

        if reset {
            Journal::reset(&self.deployment_dir())?;
        }

        let mut chain = SimulatedChain::new(self.network.chain_id);
        chain.replay_journal(&self.journal()?);

        self.deploy_with(chain, plan, false).await
    }

    /// Deploy `plan` through `backend`.
    ///
    /// The backend must be connected to the configured network and already hold the state
    /// left by the journaled actions. When `reset` is set, the journal is wiped first and
    /// every action runs.
    pub async fn deploy_with<B: ChainBackend>(
        &self,
        backend: B,
        plan: &DeploymentPlan,
        reset: bool,
    ) -> Result<DeploymentResult> {
        tracing::info!(
            network = %self.network_name,
            chain_id = self.network.chain_id,
            deployment_id = %self.deployment_id,
            deployer = %self.deployer_address,
            "Starting deployment..."
        );

        if backend.chain_id() != self.network.chain_id {
            anyhow::bail!(
                "Backend is connected to chain {} but network {} has chain ID {}",
                backend.chain_id(),
                self.network_name,
                self.network.chain_id
            );
        }

        if reset {
            Journal::reset(&self.deployment_dir())?;
        }

        let journal = self.open_journal()?;
        self.save_config()?;

        let artifacts = HardhatArtifacts::new(&self.artifacts);
        let mut executor = Executor::new(backend, artifacts, journal, self.deployer_address);

        let result = executor
            .execute(plan)
            .await
            .context(format!("Deployment {} failed", self.deployment_id))?;

        tracing::info!("✓ Deployment complete!");
        for (name, output) in &result.outputs {
            match output.address() {
                Some(address) => tracing::info!("{:<20} {}", name, address),
                None => tracing::info!("{:<20} tx {}", name, output.tx_hash()),
            }
        }

        Ok(result)
    }

    /// Remove `id` from the journal so the next deployment executes it again.
    ///
    /// Refuses while a journaled action of `plan` depends on it, since that action would
    /// keep pointing to the old result.
    pub fn wipe(&self, plan: &DeploymentPlan, id: &ActionId) -> Result<JournalEntry> {
        let mut journal = self.journal()?;

        let blocking: Vec<String> = plan
            .dependents_of(id)
            .filter(|dependent| journal.get(&dependent.id).is_some())
            .map(|dependent| dependent.id.to_string())
            .collect();
        if !blocking.is_empty() {
            anyhow::bail!(
                "Cannot wipe {}: journaled actions depend on it ({}). Wipe them first.",
                id,
                blocking.join(", ")
            );
        }

        if journal.get(id).is_none() {
            anyhow::bail!("Action {} is not in the journal", id);
        }
        let entry = journal
            .remove(id)?
            .with_context(|| format!("Action {} is not in the journal", id))?;

        tracing::info!(action = %id, "Action wiped from journal");
        Ok(entry)
    }

    /// Journaled result of every exported action of `plan`.
    pub fn outputs(&self, plan: &DeploymentPlan) -> Result<Vec<(String, Option<ActionResult>)>> {
        let journal = self.journal()?;
        Ok(plan
            .outputs()
            .iter()
            .map(|(name, id)| (name.clone(), journal.get(id).map(|entry| entry.result)))
            .collect())
    }
}
