//! Declarative construction of a [`DeploymentPlan`].

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{ActionId, ActionKind, Argument, DeploymentAction, PlanError};

/// Builder for a [`DeploymentPlan`].
///
/// Actions can only reference actions declared before them, so the declaration order
/// is always a valid execution order. No network call happens while building.
///
/// # Example
///
/// ```
/// use stakeup_deploy::{Argument, PlanBuilder};
///
/// # fn example() -> Result<(), stakeup_deploy::PlanError> {
/// let mut m = PlanBuilder::new("TokenModule");
/// let token = m.declare_contract("token", "TestToken", Vec::<Argument>::new())?;
/// m.declare_call("mint", &token, "mint", ["1000"])?;
/// let plan = m.export_outputs([("token", &token)])?;
/// assert_eq!(plan.actions().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    module: String,
    actions: Vec<DeploymentAction>,
    index: HashMap<ActionId, usize>,
}

impl PlanBuilder {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            actions: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declare the creation of a contract of type `contract`.
    pub fn declare_contract<A>(
        &mut self,
        name: impl Into<ActionId>,
        contract: impl Into<String>,
        constructor_args: impl IntoIterator<Item = A>,
    ) -> Result<ActionId, PlanError>
    where
        A: Into<Argument>,
    {
        let kind = ActionKind::CreateContract {
            contract: contract.into(),
            args: constructor_args.into_iter().map(Into::into).collect(),
        };
        self.declare(name.into(), kind)
    }

    /// Declare a call of `method` on the contract created by `target`.
    pub fn declare_call<A>(
        &mut self,
        name: impl Into<ActionId>,
        target: &ActionId,
        method: impl Into<String>,
        args: impl IntoIterator<Item = A>,
    ) -> Result<ActionId, PlanError>
    where
        A: Into<Argument>,
    {
        let kind = ActionKind::InvokeMethod {
            target: target.clone(),
            method: method.into(),
            args: args.into_iter().map(Into::into).collect(),
        };
        self.declare(name.into(), kind)
    }

    fn declare(&mut self, id: ActionId, kind: ActionKind) -> Result<ActionId, PlanError> {
        if self.index.contains_key(&id) {
            return Err(PlanError::DuplicateActionName { name: id });
        }

        let action = DeploymentAction { id, kind };

        for dep in action.dependencies() {
            if *dep == action.id {
                return Err(PlanError::CyclicReference {
                    action: action.id.clone(),
                });
            }
            let Some(&position) = self.index.get(dep) else {
                return Err(PlanError::UndeclaredReference {
                    action: action.id.clone(),
                    reference: dep.clone(),
                });
            };
            if !self.actions[position].creates_contract() {
                return Err(PlanError::ReferenceToCall {
                    action: action.id.clone(),
                    reference: dep.clone(),
                });
            }
        }

        tracing::debug!(
            module = %self.module,
            action = %action.id,
            description = %action.describe(),
            "Declared action"
        );

        let id = action.id.clone();
        self.index.insert(id.clone(), self.actions.len());
        self.actions.push(action);
        Ok(id)
    }

    /// Finalize the plan, exposing the given actions under the given names.
    ///
    /// Actions that are not exported still belong to the plan and are executed.
    pub fn export_outputs<'a, S>(
        self,
        outputs: impl IntoIterator<Item = (S, &'a ActionId)>,
    ) -> Result<DeploymentPlan, PlanError>
    where
        S: Into<String>,
    {
        let mut exported = BTreeMap::new();
        for (name, id) in outputs {
            let name = name.into();
            if !self.index.contains_key(id) {
                return Err(PlanError::UndeclaredReference {
                    action: ActionId::new(name),
                    reference: id.clone(),
                });
            }
            if exported.contains_key(&name) {
                return Err(PlanError::DuplicateOutputName { name });
            }
            exported.insert(name, id.clone());
        }

        Ok(DeploymentPlan {
            module: self.module,
            actions: self.actions,
            outputs: exported,
        })
    }
}

/// A finished, structurally valid deployment plan.
///
/// Only [`PlanBuilder::export_outputs`] creates one; a plan cannot be deserialized around
/// the declaration checks.
///
/// ```compile_fail
/// let plan: stakeup_deploy::DeploymentPlan = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    module: String,
    actions: Vec<DeploymentAction>,
    outputs: BTreeMap<String, ActionId>,
}

impl DeploymentPlan {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn actions(&self) -> &[DeploymentAction] {
        &self.actions
    }

    /// Named outputs of the plan.
    pub fn outputs(&self) -> &BTreeMap<String, ActionId> {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&ActionId> {
        self.outputs.get(name)
    }

    pub fn action(&self, id: &ActionId) -> Option<&DeploymentAction> {
        self.actions.iter().find(|action| action.id == *id)
    }

    /// Actions in an order where every action comes after the actions it references.
    pub fn execution_order(&self) -> impl Iterator<Item = &DeploymentAction> {
        self.actions.iter()
    }

    /// Actions that directly reference `id`.
    pub fn dependents_of<'a>(
        &'a self,
        id: &'a ActionId,
    ) -> impl Iterator<Item = &'a DeploymentAction> + 'a {
        self.actions
            .iter()
            .filter(move |action| action.dependencies().contains(&id))
    }
}
