//! stakeup is a CLI tool to deploy a token and its staking pool from a declarative plan.

mod cli;
mod display;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command, TargetArgs};
use stakeup_deploy::{
    ActionId, Deployer, DeployerBuilder, StakeupConfig, modules::pool_stake_module,
};

/// Directory against which configured paths are resolved.
fn project_root(config_path: &Path) -> PathBuf {
    if config_path.is_dir() {
        return config_path.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn build_deployer(config: &StakeupConfig, root: &Path, target: TargetArgs) -> Result<Deployer> {
    let network = target
        .network
        .unwrap_or_else(|| config.default_network.clone());

    let mut builder = DeployerBuilder::new(network)
        .config(config.clone())
        .root(root);

    if let Some(deployment_id) = target.deployment_id {
        builder = builder.deployment_id(deployment_id);
    }

    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = StakeupConfig::load(&cli.config)?;
    let root = project_root(&cli.config);
    let plan = pool_stake_module()?;

    match cli.command {
        Command::Plan => {
            println!("{}", display::plan_table(&plan));
        }
        Command::Deploy(args) => {
            let deployer = build_deployer(&config, &root, args.target)?;
            let result = deployer.deploy(&plan, args.reset).await?;
            println!("{}", display::outputs_table(&result));
        }
        Command::Status(target) => {
            let deployer = build_deployer(&config, &root, target)?;
            let journal = deployer.journal()?;

            tracing::info!(
                deployment_id = %deployer.deployment_id,
                journal = %journal.path().display(),
                complete = journal.is_complete(&plan),
                "Deployment status"
            );
            println!("{}", display::status_table(&plan, &journal));
        }
        Command::Wipe { action, target } => {
            let id = ActionId::new(action);
            if plan.action(&id).is_none() {
                anyhow::bail!("Action {} is not part of module {}", id, plan.module());
            }

            let deployer = build_deployer(&config, &root, target)?;
            let entry = deployer.wipe(&plan, &id)?;
            println!("Wiped {} (was completed at {})", entry.id, entry.completed_at.to_rfc3339());
        }
    }

    Ok(())
}
