//! Nodes of a deployment plan.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Stable identity of an action inside a plan.
///
/// This is the opaque reference returned by the builder's declaration methods, and it
/// is also the key the execution engine uses to deduplicate actions across runs.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for ActionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A constructor or method argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    /// A literal value, coerced to the ABI parameter type at execution time.
    Literal(String),
    /// The on-chain address produced by another action.
    Reference(ActionId),
}

impl Argument {
    /// The referenced action, if this argument is a reference.
    pub fn reference(&self) -> Option<&ActionId> {
        match self {
            Argument::Reference(id) => Some(id),
            Argument::Literal(_) => None,
        }
    }
}

impl From<&ActionId> for Argument {
    fn from(id: &ActionId) -> Self {
        Argument::Reference(id.clone())
    }
}

impl From<ActionId> for Argument {
    fn from(id: ActionId) -> Self {
        Argument::Reference(id)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Literal(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::Literal(value)
    }
}

impl From<u64> for Argument {
    fn from(value: u64) -> Self {
        Argument::Literal(value.to_string())
    }
}

impl From<u128> for Argument {
    fn from(value: u128) -> Self {
        Argument::Literal(value.to_string())
    }
}

impl std::fmt::Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Literal(value) => write!(f, "\"{}\"", value),
            Argument::Reference(id) => write!(f, "{}", id),
        }
    }
}

/// What an action does on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Deploy a new contract of the given type.
    CreateContract {
        contract: String,
        args: Vec<Argument>,
    },
    /// Call a method on a contract created by another action.
    InvokeMethod {
        target: ActionId,
        method: String,
        args: Vec<Argument>,
    },
}

/// A single named on-chain action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentAction {
    pub id: ActionId,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl DeploymentAction {
    pub fn args(&self) -> &[Argument] {
        match &self.kind {
            ActionKind::CreateContract { args, .. } | ActionKind::InvokeMethod { args, .. } => args,
        }
    }

    /// Whether this action produces a contract address.
    pub fn creates_contract(&self) -> bool {
        matches!(self.kind, ActionKind::CreateContract { .. })
    }

    /// Every action this one references, deduplicated, in order of first appearance.
    ///
    /// For calls, the target comes first.
    pub fn dependencies(&self) -> Vec<&ActionId> {
        let target = match &self.kind {
            ActionKind::InvokeMethod { target, .. } => Some(target),
            ActionKind::CreateContract { .. } => None,
        };

        let mut deps: Vec<&ActionId> = Vec::new();
        for id in target
            .into_iter()
            .chain(self.args().iter().filter_map(Argument::reference))
        {
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        deps
    }

    /// Short human-readable description, e.g. `TestToken()` or `testToken.transfer(poolStake, "1")`.
    pub fn describe(&self) -> String {
        let join = |args: &[Argument]| {
            args.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        match &self.kind {
            ActionKind::CreateContract { contract, args } => {
                format!("{}({})", contract, join(args))
            }
            ActionKind::InvokeMethod {
                target,
                method,
                args,
            } => format!("{}.{}({})", target, method, join(args)),
        }
    }
}
