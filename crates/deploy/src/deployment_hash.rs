use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{DeploymentAction, DeploymentPlan};

/// SHA-256 of the JSON serialization of `value`, hex-encoded.
fn sha256_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).expect("plan serialization should never fail");

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a single action's definition.
///
/// Two actions with the same name but different contract type, target, method or
/// arguments get different fingerprints. The journal stores this next to each completed
/// action so that a changed definition is detected instead of silently reused.
pub fn action_fingerprint(action: &DeploymentAction) -> String {
    sha256_json(action)
}

/// The parts of a plan that affect what gets executed.
///
/// Exported output names are excluded: renaming or adding an export does not require
/// re-executing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanHash<'a> {
    pub module: &'a str,
    pub actions: &'a [DeploymentAction],
}

impl<'a> PlanHash<'a> {
    pub fn from_plan(plan: &'a DeploymentPlan) -> Self {
        Self {
            module: plan.module(),
            actions: plan.actions(),
        }
    }

    /// Compute a SHA-256 hash of the plan.
    ///
    /// The hash is deterministic - the same plan always produces the same hash.
    pub fn compute_hash(&self) -> String {
        sha256_json(self)
    }
}
