//! Deployment modules shipped with stakeup.

pub mod pool_stake;

pub use pool_stake::pool_stake_module;
