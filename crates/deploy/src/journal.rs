//! Persistent record of completed actions.
//!
//! Each deployment has its own directory holding `journal.json`. An action is journaled as
//! soon as it is confirmed, so an interrupted run resumes where it stopped and a complete
//! run is never repeated.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::{
    ActionId, DeploymentPlan,
    deployment_hash::{PlanHash, action_fingerprint},
};

pub const JOURNAL_FILENAME: &str = "journal.json";
const LOCK_FILENAME: &str = "journal.lock";

/// Outcome of a completed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResult {
    Deployed { address: Address, tx_hash: B256 },
    Called { tx_hash: B256 },
}

impl ActionResult {
    /// The contract address, for contract creations.
    pub fn address(&self) -> Option<Address> {
        match self {
            ActionResult::Deployed { address, .. } => Some(*address),
            ActionResult::Called { .. } => None,
        }
    }

    pub fn tx_hash(&self) -> B256 {
        match self {
            ActionResult::Deployed { tx_hash, .. } | ActionResult::Called { tx_hash } => *tx_hash,
        }
    }
}

/// A completed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: ActionId,
    /// Fingerprint of the action definition that was executed.
    pub fingerprint: String,
    pub result: ActionResult,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JournalFile {
    chain_id: u64,
    /// Account every journaled action was sent from.
    deployer: Address,
    /// Stakeup version that last wrote this journal.
    stakeup_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan_hash: Option<String>,
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

impl JournalFile {
    fn new(chain_id: u64, deployer: Address) -> Self {
        Self {
            chain_id,
            deployer,
            stakeup_version: env!("CARGO_PKG_VERSION").to_string(),
            module: None,
            plan_hash: None,
            entries: Vec::new(),
        }
    }
}

/// Journal of one deployment.
#[derive(Debug)]
pub struct Journal {
    dir: PathBuf,
    data: JournalFile,
}

impl Journal {
    /// Open the journal stored in `dir`, creating the directory if needed.
    ///
    /// Fails if the existing journal belongs to a different chain or deployer account.
    pub fn open(dir: impl Into<PathBuf>, chain_id: u64, deployer: Address) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).context(format!(
            "Failed to create deployment directory {}",
            dir.display()
        ))?;

        Self::read(dir, chain_id, deployer)
    }

    /// Load the journal stored in `dir` without touching the filesystem.
    ///
    /// A missing journal reads as empty; its directory is only created by the first write.
    pub fn read(dir: impl Into<PathBuf>, chain_id: u64, deployer: Address) -> Result<Self> {
        let dir = dir.into();

        let data = match Self::load_from_disk(&dir)? {
            Some(data) if data.chain_id != chain_id => anyhow::bail!(
                "Deployment at {} was made on chain {} but the target network has chain {}",
                dir.display(),
                data.chain_id,
                chain_id
            ),
            Some(data) if data.deployer != deployer => anyhow::bail!(
                "Deployment at {} was made by {} but the deployer account is {}. \
                 Use the same private key or another deployment ID.",
                dir.display(),
                data.deployer,
                deployer
            ),
            Some(data) => data,
            None => JournalFile::new(chain_id, deployer),
        };

        tracing::debug!(
            path = %dir.display(),
            entries = data.entries.len(),
            "Journal opened"
        );

        Ok(Self { dir, data })
    }

    /// Delete the journal stored in `dir`, if any.
    pub fn reset(dir: &Path) -> Result<()> {
        let path = dir.join(JOURNAL_FILENAME);
        if path.exists() {
            fs::remove_file(&path)
                .context(format!("Failed to remove journal {}", path.display()))?;
            tracing::info!(path = %path.display(), "Journal wiped");
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILENAME)
    }

    pub fn chain_id(&self) -> u64 {
        self.data.chain_id
    }

    /// Account the journaled actions were sent from.
    pub fn deployer(&self) -> Address {
        self.data.deployer
    }

    /// Module name of the plan last executed against this deployment.
    pub fn module(&self) -> Option<&str> {
        self.data.module.as_deref()
    }

    pub fn plan_hash(&self) -> Option<&str> {
        self.data.plan_hash.as_deref()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.data.entries
    }

    pub fn get(&self, id: &ActionId) -> Option<&JournalEntry> {
        self.data.entries.iter().find(|entry| entry.id == *id)
    }

    /// Whether every action of `plan` has been executed with its current definition.
    pub fn is_complete(&self, plan: &DeploymentPlan) -> bool {
        plan.actions().iter().all(|action| {
            self.get(&action.id)
                .is_some_and(|entry| entry.fingerprint == action_fingerprint(action))
        })
    }

    /// Remember which plan is being executed against this deployment.
    pub fn begin(&mut self, plan: &DeploymentPlan) -> Result<()> {
        let module = plan.module().to_string();
        let plan_hash = PlanHash::from_plan(plan).compute_hash();

        self.update(|data| {
            data.module = Some(module);
            data.plan_hash = Some(plan_hash);
        })
    }

    /// Record a completed action, replacing any previous entry with the same id.
    pub fn record(&mut self, entry: JournalEntry) -> Result<()> {
        tracing::debug!(action = %entry.id, result = ?entry.result, "Journaling action");

        self.update(move |data| {
            data.entries.retain(|existing| existing.id != entry.id);
            data.entries.push(entry);
        })
    }

    /// Forget a completed action so that the next run executes it again.
    pub fn remove(&mut self, id: &ActionId) -> Result<Option<JournalEntry>> {
        let mut removed = None;
        self.update(|data| {
            if let Some(pos) = data.entries.iter().position(|entry| entry.id == *id) {
                removed = Some(data.entries.remove(pos));
            }
        })?;
        Ok(removed)
    }

    /// Apply `change` to the on-disk journal under an exclusive lock, then refresh the
    /// in-memory copy.
    fn update(&mut self, change: impl FnOnce(&mut JournalFile)) -> Result<()> {
        fs::create_dir_all(&self.dir).context(format!(
            "Failed to create deployment directory {}",
            self.dir.display()
        ))?;

        let lock_path = self.dir.join(LOCK_FILENAME);
        let lock_file = fs::File::create(&lock_path)
            .context(format!("Failed to create lock file {}", lock_path.display()))?;
        lock_file
            .lock_exclusive()
            .context(format!("Failed to lock {}", lock_path.display()))?;

        let result = (|| -> Result<()> {
            let mut data = Self::load_from_disk(&self.dir)?
                .unwrap_or_else(|| JournalFile::new(self.data.chain_id, self.data.deployer));
            change(&mut data);
            data.stakeup_version = env!("CARGO_PKG_VERSION").to_string();
            Self::save_to_disk(&self.dir, &data)?;
            self.data = data;
            Ok(())
        })();

        if let Err(err) = FileExt::unlock(&lock_file) {
            tracing::warn!(path = %lock_path.display(), error = %err, "Failed to unlock journal");
        }
        result
    }

    fn load_from_disk(dir: &Path) -> Result<Option<JournalFile>> {
        let path = dir.join(JOURNAL_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read journal from {}", path.display()))?;
        let data = serde_json::from_str(&content)
            .context(format!("Failed to parse journal {}", path.display()))?;
        Ok(Some(data))
    }

    fn save_to_disk(dir: &Path, data: &JournalFile) -> Result<()> {
        let path = dir.join(JOURNAL_FILENAME);
        let tmp_path = dir.join(format!("{}.tmp", JOURNAL_FILENAME));

        let json = serde_json::to_string_pretty(data).context("Failed to serialize journal")?;
        fs::write(&tmp_path, json)
            .context(format!("Failed to write journal to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .context(format!("Failed to move journal into place at {}", path.display()))?;

        Ok(())
    }
}
