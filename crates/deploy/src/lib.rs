//! stakeup-deploy - Declarative deployment plans for smart contracts.
//!
//! A [`DeploymentPlan`] is declared with a [`PlanBuilder`], validated as it is built, and
//! executed by an [`Executor`] that journals every completed action so that running the
//! same plan again against the same deployment does not repeat any action.

pub mod artifacts;
pub mod backend;
mod builder;
pub mod config;
mod deployer;
pub mod deployment_hash;
mod executor;
pub mod journal;
pub mod modules;
pub mod plan;

pub use artifacts::{Artifact, ArtifactSource, HardhatArtifacts, InMemoryArtifacts};
pub use backend::{ChainBackend, DeployedContract, SimulatedChain, SimulatedTransaction};
pub use builder::{DEV_ACCOUNT_PRIVATE_KEY, DeployerBuilder, address_from_private_key};
pub use config::{NetworkConfig, NetworkPreset, StakeupConfig};
pub use deployer::{DEPLOYMENT_FILENAME, Deployer};
pub use executor::{DeploymentResult, Executor};
pub use journal::{ActionResult, Journal, JournalEntry};
pub use plan::{
    ActionId, ActionKind, Argument, DeploymentAction, DeploymentPlan, PlanBuilder, PlanError,
};
