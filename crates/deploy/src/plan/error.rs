use thiserror::Error;

use super::ActionId;

/// Structural errors detected while a plan is being declared.
///
/// They are reported synchronously by the declaration that caused them; a failed
/// declaration leaves the builder unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// An action name was declared twice in the same plan.
    #[error("action '{name}' is already declared in this plan")]
    DuplicateActionName { name: ActionId },

    /// An action references a name that has not been declared yet.
    #[error("action '{action}' references undeclared action '{reference}'")]
    UndeclaredReference { action: ActionId, reference: ActionId },

    /// An action references a call, which has no on-chain address.
    #[error("action '{action}' references '{reference}', which is a call and has no address")]
    ReferenceToCall { action: ActionId, reference: ActionId },

    /// An action would depend on itself.
    #[error("action '{action}' depends on itself")]
    CyclicReference { action: ActionId },

    /// The same export name was given twice.
    #[error("output '{name}' is exported more than once")]
    DuplicateOutputName { name: String },
}

impl PlanError {
    /// The name of the offending action or output.
    pub fn offending_name(&self) -> &str {
        match self {
            PlanError::DuplicateActionName { name } => name.as_str(),
            PlanError::UndeclaredReference { action, .. } => action.as_str(),
            PlanError::ReferenceToCall { action, .. } => action.as_str(),
            PlanError::CyclicReference { action } => action.as_str(),
            PlanError::DuplicateOutputName { name } => name,
        }
    }
}
