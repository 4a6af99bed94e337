//! Integration tests for stakeup-deploy.
//!
//! These tests execute the PoolStake plan on the in-process simulated chain, with
//! Hardhat-style artifacts written to a temporary project directory.

use std::path::Path;

use alloy_core::primitives::{Address, address};
use anyhow::Result;
use stakeup_deploy::{
    ActionId, ActionResult, Argument, Artifact, DEV_ACCOUNT_PRIVATE_KEY, Deployer,
    DeployerBuilder, Executor, InMemoryArtifacts, Journal, PlanBuilder, PlanError,
    SimulatedChain,
    modules::pool_stake::{FUND_POOL, POOL_STAKE, TEST_TOKEN, pool_stake_module},
};
use tempdir::TempDir;

const DEV_ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const FIRST_CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
const SECOND_CONTRACT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

const TEST_TOKEN_ARTIFACT: &str = r#"{
    "_format": "hh-sol-artifact-1",
    "contractName": "TestToken",
    "sourceName": "contracts/TestToken.sol",
    "abi": [
        {"type": "constructor", "inputs": [], "stateMutability": "nonpayable"},
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}],
         "outputs": [{"name": "", "type": "bool"}]},
        {"type": "function", "name": "balanceOf", "stateMutability": "view",
         "inputs": [{"name": "account", "type": "address"}],
         "outputs": [{"name": "", "type": "uint256"}]}
    ],
    "bytecode": "0x608060405234801561001057600080fd5b50",
    "deployedBytecode": "0x6080604052"
}"#;

const POOL_STAKE_ARTIFACT: &str = r#"{
    "_format": "hh-sol-artifact-1",
    "contractName": "poolstake",
    "sourceName": "contracts/poolstake.sol",
    "abi": [
        {"type": "constructor", "stateMutability": "nonpayable",
         "inputs": [{"name": "_stakingToken", "type": "address"}, {"name": "_rewardToken", "type": "address"}]},
        {"type": "function", "name": "stake", "stateMutability": "nonpayable",
         "inputs": [{"name": "amount", "type": "uint256"}], "outputs": []}
    ],
    "bytecode": "0x608060405234801561001057600080fd5b5060",
    "deployedBytecode": "0x6080604052"
}"#;

fn write_artifact(root: &Path, source: &str, contract: &str, json: &str) {
    let dir = root.join("artifacts/contracts").join(source);
    std::fs::create_dir_all(&dir).expect("Failed to create artifacts dir");
    std::fs::write(dir.join(format!("{}.json", contract)), json).expect("Failed to write artifact");
}

fn project(with_pool: bool) -> TempDir {
    let temp_dir = TempDir::new("stakeup-test").expect("Failed to create temp dir");
    write_artifact(temp_dir.path(), "TestToken.sol", "TestToken", TEST_TOKEN_ARTIFACT);
    if with_pool {
        write_artifact(temp_dir.path(), "poolstake.sol", "poolstake", POOL_STAKE_ARTIFACT);
    }
    temp_dir
}

fn in_memory_artifacts() -> InMemoryArtifacts {
    InMemoryArtifacts::new()
        .with(Artifact::from_json(TEST_TOKEN_ARTIFACT).unwrap())
        .with(Artifact::from_json(POOL_STAKE_ARTIFACT).unwrap())
}

#[tokio::test]
async fn test_pool_stake_deployment() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    let plan = pool_stake_module()?;

    let result = deployer.deploy(&plan, false).await?;

    assert_eq!(
        result.executed,
        vec![
            ActionId::new(TEST_TOKEN),
            ActionId::new(POOL_STAKE),
            ActionId::new(FUND_POOL)
        ]
    );
    assert!(result.skipped.is_empty());
    assert_eq!(result.outputs.len(), 2);
    assert_eq!(result.address(TEST_TOKEN), Some(FIRST_CONTRACT));
    assert_eq!(result.address(POOL_STAKE), Some(SECOND_CONTRACT));
    assert!(result.address(FUND_POOL).is_none());

    let journal = deployer.journal()?;
    assert_eq!(journal.entries().len(), 3);
    assert_eq!(journal.module(), Some("PoolStakeModule"));
    assert!(journal.is_complete(&plan));
    assert!(deployer.deployment_dir().join("deployment.toml").exists());

    Ok(())
}

#[tokio::test]
async fn test_redeploy_is_idempotent() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;

    let first = deployer.deploy(&pool_stake_module()?, false).await?;
    let second = deployer.deploy(&pool_stake_module()?, false).await?;

    assert!(second.executed.is_empty());
    assert_eq!(second.skipped.len(), 3);
    assert_eq!(first.outputs, second.outputs);

    // Journaled entries keep their original completion records.
    assert_eq!(deployer.journal()?.entries().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_executor_submits_in_dependency_order() -> Result<()> {
    let project = TempDir::new("stakeup-test")?;
    let journal = Journal::open(project.path().join("chain-31337"), 31337, DEV_ACCOUNT)?;
    let plan = pool_stake_module()?;

    let mut executor = Executor::new(
        SimulatedChain::new(31337),
        in_memory_artifacts(),
        journal,
        DEV_ACCOUNT,
    );
    executor.execute(&plan).await?;

    let txs = executor.backend().transactions();
    assert_eq!(txs.len(), 3);

    // Both constructor arguments of the pool are the token address.
    assert!(txs[0].to.is_none());
    assert!(txs[1].to.is_none());
    let pool_init = &txs[1].input;
    let args = &pool_init[pool_init.len() - 64..];
    assert_eq!(&args[12..32], FIRST_CONTRACT.as_slice());
    assert_eq!(&args[44..64], FIRST_CONTRACT.as_slice());

    // The funding transfer goes to the token and pays the pool.
    assert_eq!(txs[2].to, Some(FIRST_CONTRACT));
    let calldata = &txs[2].input;
    assert_eq!(hex::encode(&calldata[..4]), "a9059cbb");
    assert_eq!(&calldata[16..36], SECOND_CONTRACT.as_slice());

    Ok(())
}

#[tokio::test]
async fn test_failed_run_resumes_from_journal() -> Result<()> {
    let project = project(false);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    let plan = pool_stake_module()?;

    // The pool artifact is missing: the token is deployed, then the run stops.
    let err = deployer.deploy(&plan, false).await.unwrap_err();
    assert!(format!("{:#}", err).contains(POOL_STAKE));
    assert_eq!(deployer.journal()?.entries().len(), 1);

    write_artifact(project.path(), "poolstake.sol", "poolstake", POOL_STAKE_ARTIFACT);
    let result = deployer.deploy(&plan, false).await?;

    assert_eq!(result.skipped, vec![ActionId::new(TEST_TOKEN)]);
    assert_eq!(
        result.executed,
        vec![ActionId::new(POOL_STAKE), ActionId::new(FUND_POOL)]
    );
    assert_eq!(result.address(TEST_TOKEN), Some(FIRST_CONTRACT));
    assert_eq!(result.address(POOL_STAKE), Some(SECOND_CONTRACT));

    Ok(())
}

#[tokio::test]
async fn test_changed_action_is_not_silently_reused() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    deployer.deploy(&pool_stake_module()?, false).await?;

    // Same names, different funding amount.
    let mut m = PlanBuilder::new("PoolStakeModule");
    let token = m.declare_contract(TEST_TOKEN, "TestToken", Vec::<Argument>::new())?;
    let pool = m.declare_contract(POOL_STAKE, "poolstake", [&token, &token])?;
    m.declare_call(
        FUND_POOL,
        &token,
        "transfer",
        [Argument::from(&pool), Argument::from("1")],
    )?;
    let changed = m.export_outputs([(TEST_TOKEN, &token), (POOL_STAKE, &pool)])?;

    let err = deployer.deploy(&changed, false).await.unwrap_err();
    assert!(format!("{:#}", err).contains("different definition"));

    // After a reset everything runs again.
    let result = deployer.deploy(&changed, true).await?;
    assert_eq!(result.executed.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_wipe_reexecutes_only_the_wiped_action() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    let plan = pool_stake_module()?;
    let first = deployer.deploy(&plan, false).await?;

    // The token cannot be wiped while the pool and the transfer still point to it.
    let err = deployer
        .wipe(&plan, &ActionId::new(TEST_TOKEN))
        .unwrap_err()
        .to_string();
    assert!(err.contains(POOL_STAKE));
    assert!(err.contains(FUND_POOL));

    deployer.wipe(&plan, &ActionId::new(FUND_POOL))?;
    assert!(deployer.wipe(&plan, &ActionId::new(FUND_POOL)).is_err());

    let second = deployer.deploy(&plan, false).await?;
    assert_eq!(second.executed, vec![ActionId::new(FUND_POOL)]);
    assert_eq!(first.outputs, second.outputs);

    Ok(())
}

#[tokio::test]
async fn test_deployments_are_isolated_by_id() -> Result<()> {
    let project = project(true);
    let plan = pool_stake_module()?;

    let a = DeployerBuilder::new("local")
        .root(project.path())
        .deployment_id("a")
        .build()?;
    let b = DeployerBuilder::new("local")
        .root(project.path())
        .deployment_id("b")
        .build()?;

    a.deploy(&plan, false).await?;
    let result = b.deploy(&plan, false).await?;

    assert_eq!(result.executed.len(), 3);
    assert_ne!(a.deployment_dir(), b.deployment_dir());

    Ok(())
}

#[tokio::test]
async fn test_saved_deployment_reports_outputs() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    let plan = pool_stake_module()?;

    // Nothing journaled yet, and reading the journal leaves the disk alone.
    assert!(deployer.outputs(&plan)?.iter().all(|(_, result)| result.is_none()));
    assert!(deployer.journal()?.entries().is_empty());
    assert!(!deployer.deployment_dir().exists());

    deployer.deploy(&plan, false).await?;

    let loaded = Deployer::load_from_file(&deployer.deployment_dir())?;
    assert_eq!(loaded, deployer);

    let outputs = loaded.outputs(&plan)?;
    assert_eq!(outputs.len(), 2);
    for (name, result) in outputs {
        let expected = if name == TEST_TOKEN {
            FIRST_CONTRACT
        } else {
            SECOND_CONTRACT
        };
        assert_eq!(result.and_then(|r| r.address()), Some(expected));
    }

    Ok(())
}

#[tokio::test]
async fn test_references_resolve_to_deployed_addresses() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("local").root(project.path()).build()?;
    let plan = pool_stake_module()?;
    deployer.deploy(&plan, false).await?;

    // Every referenced action of the plan has an address in the journal.
    let journal = deployer.journal()?;
    for action in plan.actions() {
        for dependency in action.dependencies() {
            let entry = journal.get(dependency).expect("dependency is journaled");
            assert!(
                matches!(entry.result, ActionResult::Deployed { .. }),
                "{} references {}, which has no address",
                action.id,
                dependency
            );
        }
    }

    // A plan referencing a call never gets built, so nothing of it can run.
    let mut m = PlanBuilder::new("PoolStakeModule");
    let token = m.declare_contract(TEST_TOKEN, "TestToken", Vec::<Argument>::new())?;
    let fund = m.declare_call(FUND_POOL, &token, "transfer", [&token, &token])?;
    let err = m
        .declare_contract(POOL_STAKE, "poolstake", [&fund, &fund])
        .unwrap_err();
    assert_eq!(
        err,
        PlanError::ReferenceToCall {
            action: ActionId::new(POOL_STAKE),
            reference: fund.clone(),
        }
    );
    assert!(matches!(
        m.declare_call("poke", &fund, "stake", ["1"]),
        Err(PlanError::ReferenceToCall { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_simulated_deploy_refused_on_remote_network() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("base-sepolia")
        .root(project.path())
        .private_key(DEV_ACCOUNT_PRIVATE_KEY)
        .build()?;

    let err = deployer
        .deploy(&pool_stake_module()?, false)
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("84532"));

    // Nothing was journaled for the remote chain.
    assert!(!deployer.deployment_dir().exists());
    assert!(deployer.journal()?.entries().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_deploy_with_injected_backend() -> Result<()> {
    let project = project(true);
    let deployer = DeployerBuilder::new("base-sepolia")
        .root(project.path())
        .private_key(DEV_ACCOUNT_PRIVATE_KEY)
        .build()?;
    let plan = pool_stake_module()?;

    // A backend on the wrong chain is rejected before anything is written.
    let err = deployer
        .deploy_with(SimulatedChain::new(31337), &plan, false)
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("31337"));
    assert!(!deployer.deployment_dir().exists());

    let result = deployer
        .deploy_with(SimulatedChain::new(84532), &plan, false)
        .await?;
    assert_eq!(result.executed.len(), 3);
    assert_eq!(result.address(TEST_TOKEN), Some(FIRST_CONTRACT));

    let journal = deployer.journal()?;
    assert_eq!(journal.chain_id(), 84532);
    assert_eq!(journal.deployer(), DEV_ACCOUNT);

    Ok(())
}

#[tokio::test]
async fn test_journal_bound_to_deployer_account() -> Result<()> {
    let project = project(true);
    let plan = pool_stake_module()?;
    DeployerBuilder::new("local")
        .root(project.path())
        .build()?
        .deploy(&plan, false)
        .await?;

    // Second dev account, same deployment id.
    let other = DeployerBuilder::new("local")
        .root(project.path())
        .private_key("0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d")
        .build()?;

    let err = other.deploy(&plan, false).await.unwrap_err();
    assert!(format!("{:#}", err).contains(&DEV_ACCOUNT.to_string()));
    assert!(other.journal().is_err());

    Ok(())
}
