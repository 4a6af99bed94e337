use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "stakeup")]
#[command(
    author,
    version,
    about = "Deploy the TestToken + poolstake contract pair from a declarative plan"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "STAKEUP_VERBOSITY", default_value_t = LevelFilter::INFO, global = true)]
    pub verbosity: LevelFilter,

    /// Path to the Stakeup.toml configuration file, or to the project directory holding it.
    ///
    /// Artifact and deployment paths are resolved relative to the directory of this file.
    #[arg(long, alias = "conf", env = "STAKEUP_CONFIG", default_value = ".", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the deployment plan without executing anything.
    Plan,

    /// Execute the deployment plan, skipping actions that already completed.
    Deploy(DeployArgs),

    /// Show which actions of the plan have been executed.
    Status(TargetArgs),

    /// Forget a completed action so that the next deployment executes it again.
    Wipe {
        /// The name of the action to wipe.
        action: String,

        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Selects the deployment a command applies to.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// The network to deploy to, as named in the configuration.
    ///
    /// If not provided, the configured `default_network` is used.
    #[arg(short, long, env = "STAKEUP_NETWORK")]
    pub network: Option<String>,

    /// A custom deployment ID.
    ///
    /// If not provided, the deployment is named: chain-<chain-id>.
    #[arg(long, alias = "id", env = "STAKEUP_DEPLOYMENT_ID")]
    pub deployment_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Wipe the journal and execute every action again.
    #[arg(long, env = "STAKEUP_RESET", default_value_t = false)]
    pub reset: bool,
}
