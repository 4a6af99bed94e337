//! Deployment plans: a validated, dependency-ordered graph of on-chain actions.

mod action;
mod builder;
mod error;

pub use action::{ActionId, ActionKind, Argument, DeploymentAction};
pub use builder::{DeploymentPlan, PlanBuilder};
pub use error::PlanError;
