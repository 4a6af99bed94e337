//! Token + staking pool deployment.
//!
//! Deploys `TestToken`, deploys `poolstake` using the token both as the staking token
//! and as the reward token, then funds the pool with [`POOL_FUNDING_AMOUNT`] tokens
//! from the deployer.

use crate::{Argument, DeploymentPlan, PlanBuilder, PlanError};

pub const MODULE_NAME: &str = "PoolStakeModule";

pub const TEST_TOKEN: &str = "testToken";
pub const POOL_STAKE: &str = "poolStake";
pub const FUND_POOL: &str = "fundPool";

/// 10,000 tokens with 18 decimals.
pub const POOL_FUNDING_AMOUNT: &str = "10000000000000000000000";

/// Build the PoolStake deployment plan.
///
/// Only the two contracts are exported; the funding transfer runs but has no output.
pub fn pool_stake_module() -> Result<DeploymentPlan, PlanError> {
    let mut m = PlanBuilder::new(MODULE_NAME);

    let test_token = m.declare_contract(TEST_TOKEN, "TestToken", Vec::<Argument>::new())?;
    let pool_stake = m.declare_contract(POOL_STAKE, "poolstake", [&test_token, &test_token])?;

    m.declare_call(
        FUND_POOL,
        &test_token,
        "transfer",
        [Argument::from(&pool_stake), Argument::from(POOL_FUNDING_AMOUNT)],
    )?;

    m.export_outputs([(TEST_TOKEN, &test_token), (POOL_STAKE, &pool_stake)])
}
