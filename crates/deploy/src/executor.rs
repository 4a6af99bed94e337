//! Execution engine for deployment plans.

use std::collections::{BTreeMap, HashMap};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chrono::Utc;

use crate::{
    ActionId, ActionKind, Argument, ArtifactSource, ChainBackend, DeploymentAction,
    DeploymentPlan,
    deployment_hash::action_fingerprint,
    journal::{ActionResult, Journal, JournalEntry},
};

/// Outcome of executing a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub module: String,
    /// Results of the plan's exported actions, by export name.
    pub outputs: BTreeMap<String, ActionResult>,
    /// Actions submitted during this run, in order.
    pub executed: Vec<ActionId>,
    /// Actions found in the journal and not submitted again.
    pub skipped: Vec<ActionId>,
}

impl DeploymentResult {
    /// Address of an exported contract.
    pub fn address(&self, output: &str) -> Option<Address> {
        self.outputs.get(output).and_then(ActionResult::address)
    }
}

/// Executes plans against a chain backend, journaling every completed action.
///
/// Actions run one at a time in declaration order, which guarantees that every referenced
/// action has completed and its address is known. Actions already in the journal with the
/// same definition are not submitted again.
pub struct Executor<B, S> {
    backend: B,
    artifacts: S,
    journal: Journal,
    from: Address,
}

impl<B, S> Executor<B, S>
where
    B: ChainBackend,
    S: ArtifactSource,
{
    pub fn new(backend: B, artifacts: S, journal: Journal, from: Address) -> Self {
        Self {
            backend,
            artifacts,
            journal,
            from,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn into_journal(self) -> Journal {
        self.journal
    }

    /// Execute every action of `plan` that is not journaled yet.
    pub async fn execute(&mut self, plan: &DeploymentPlan) -> Result<DeploymentResult> {
        if self.backend.chain_id() != self.journal.chain_id() {
            anyhow::bail!(
                "Backend is connected to chain {} but the journal belongs to chain {}",
                self.backend.chain_id(),
                self.journal.chain_id()
            );
        }

        if self.from != self.journal.deployer() {
            anyhow::bail!(
                "Actions would be sent from {} but the journal belongs to {}",
                self.from,
                self.journal.deployer()
            );
        }

        tracing::info!(
            module = plan.module(),
            actions = plan.actions().len(),
            journal = %self.journal.path().display(),
            "Executing deployment plan..."
        );

        self.journal.begin(plan)?;

        let mut resolved: HashMap<ActionId, ActionResult> = HashMap::new();
        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for action in plan.execution_order() {
            let fingerprint = action_fingerprint(action);

            if let Some(entry) = self.journal.get(&action.id) {
                if entry.fingerprint != fingerprint {
                    anyhow::bail!(
                        "Action {} was already executed with a different definition. \
                         Wipe it from the journal or reset the deployment to execute it again.",
                        action.id
                    );
                }

                tracing::debug!(action = %action.id, "Action already executed, skipping");
                resolved.insert(action.id.clone(), entry.result);
                skipped.push(action.id.clone());
                continue;
            }

            tracing::info!(
                action = %action.id,
                description = %action.describe(),
                "Executing action..."
            );

            let result = self
                .run(plan, action, &resolved)
                .await
                .with_context(|| format!("Failed to execute action {}", action.id))?;

            match result {
                ActionResult::Deployed { address, tx_hash } => {
                    tracing::info!(action = %action.id, %address, %tx_hash, "Contract deployed");
                }
                ActionResult::Called { tx_hash } => {
                    tracing::info!(action = %action.id, %tx_hash, "Call confirmed");
                }
            }

            self.journal.record(JournalEntry {
                id: action.id.clone(),
                fingerprint,
                result,
                completed_at: Utc::now(),
            })?;

            resolved.insert(action.id.clone(), result);
            executed.push(action.id.clone());
        }

        let outputs = plan
            .outputs()
            .iter()
            .filter_map(|(name, id)| resolved.get(id).map(|result| (name.clone(), *result)))
            .collect();

        tracing::info!(
            module = plan.module(),
            executed = executed.len(),
            skipped = skipped.len(),
            "Deployment plan executed"
        );

        Ok(DeploymentResult {
            module: plan.module().to_string(),
            outputs,
            executed,
            skipped,
        })
    }

    async fn run(
        &mut self,
        plan: &DeploymentPlan,
        action: &DeploymentAction,
        resolved: &HashMap<ActionId, ActionResult>,
    ) -> Result<ActionResult> {
        let args = resolve_args(action.args(), resolved)?;

        match &action.kind {
            ActionKind::CreateContract { contract, .. } => {
                let artifact = self.artifacts.artifact(contract)?;
                let init_code = artifact.encode_deployment(&args)?;

                let deployed = self.backend.deploy_contract(self.from, init_code).await?;
                Ok(ActionResult::Deployed {
                    address: deployed.address,
                    tx_hash: deployed.tx_hash,
                })
            }
            ActionKind::InvokeMethod { target, method, .. } => {
                let contract = match plan.action(target).map(|t| &t.kind) {
                    Some(ActionKind::CreateContract { contract, .. }) => contract,
                    _ => anyhow::bail!("Call target {} is not a contract creation", target),
                };
                let to = resolve_address(target, resolved)?;

                let artifact = self.artifacts.artifact(contract)?;
                let calldata = artifact.encode_call(method, &args)?;

                let tx_hash = self.backend.send_transaction(self.from, to, calldata).await?;
                Ok(ActionResult::Called { tx_hash })
            }
        }
    }
}

fn resolve_address(id: &ActionId, resolved: &HashMap<ActionId, ActionResult>) -> Result<Address> {
    resolved
        .get(id)
        .with_context(|| format!("Action {} has not been executed yet", id))?
        .address()
        .with_context(|| format!("Action {} is a call and has no address", id))
}

/// Turn arguments into strings ready for ABI coercion, replacing references with addresses.
fn resolve_args(
    args: &[Argument],
    resolved: &HashMap<ActionId, ActionResult>,
) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| match arg {
            Argument::Literal(value) => Ok(value.clone()),
            Argument::Reference(id) => resolve_address(id, resolved).map(|a| a.to_string()),
        })
        .collect()
}
