//! Chain backends that actions are submitted to.

use std::{collections::HashMap, future::Future};

use alloy_core::primitives::{Address, B256, Bytes, keccak256};
use anyhow::Result;

use crate::Journal;

/// Result of a contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub tx_hash: B256,
}

/// A chain that accepts contract creations and calls.
///
/// Implementations are expected to return only once the transaction is confirmed.
pub trait ChainBackend: Send {
    /// The chain ID of the network this backend submits to.
    fn chain_id(&self) -> u64;

    /// Create a contract from `init_code` (creation bytecode + encoded constructor args).
    fn deploy_contract(
        &mut self,
        from: Address,
        init_code: Bytes,
    ) -> impl Future<Output = Result<DeployedContract>> + Send;

    /// Send a call to an existing contract, returning the transaction hash.
    fn send_transaction(
        &mut self,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<B256>> + Send;
}

/// A transaction accepted by the [`SimulatedChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedTransaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creations.
    pub to: Option<Address>,
    pub input: Bytes,
}

/// An in-process chain that only tracks nonces, created contracts and transactions.
///
/// Contract addresses are derived the same way as on Ethereum (sender + nonce), so a
/// fresh simulated chain reproduces the addresses a fresh development node would give.
/// No EVM code is run.
#[derive(Debug, Clone)]
pub struct SimulatedChain {
    chain_id: u64,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    transactions: Vec<SimulatedTransaction>,
}

impl SimulatedChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            nonces: HashMap::new(),
            code: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn nonce(&self, account: Address) -> u64 {
        self.nonces.get(&account).copied().unwrap_or_default()
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.code.contains_key(&address)
    }

    /// Bring the chain to the state left by the journaled actions.
    ///
    /// Each journal entry counts as one transaction from the journal's deployer; contract
    /// creations mark their address as holding code. Replaying a journal on a fresh chain
    /// therefore keeps the next CREATE address in line with what was already deployed.
    pub fn replay_journal(&mut self, journal: &Journal) {
        let from = journal.deployer();
        for entry in journal.entries() {
            *self.nonces.entry(from).or_default() += 1;
            if let Some(address) = entry.result.address() {
                self.code.insert(address, Bytes::new());
            }
        }

        tracing::debug!(
            %from,
            nonce = self.nonce(from),
            contracts = self.code.len(),
            "Replayed journal into simulated chain"
        );
    }

    /// Every transaction accepted so far, in order.
    pub fn transactions(&self) -> &[SimulatedTransaction] {
        &self.transactions
    }

    /// Bump the nonce of `from` and record the transaction.
    fn submit(&mut self, from: Address, to: Option<Address>, input: Bytes) -> (u64, B256) {
        let nonce = self.nonce(from);
        self.nonces.insert(from, nonce + 1);

        let mut preimage = Vec::with_capacity(20 + 8 + input.len());
        preimage.extend_from_slice(from.as_slice());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&input);
        let hash = keccak256(&preimage);

        self.transactions.push(SimulatedTransaction {
            hash,
            from,
            to,
            input,
        });
        (nonce, hash)
    }
}

impl ChainBackend for SimulatedChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn deploy_contract(&mut self, from: Address, init_code: Bytes) -> Result<DeployedContract> {
        if init_code.is_empty() {
            anyhow::bail!("Contract creation from {} has empty init code", from);
        }

        let (nonce, tx_hash) = self.submit(from, None, init_code.clone());
        let address = from.create(nonce);
        self.code.insert(address, init_code);

        tracing::trace!(%from, nonce, %address, %tx_hash, "Simulated contract creation");
        Ok(DeployedContract { address, tx_hash })
    }

    async fn send_transaction(&mut self, from: Address, to: Address, calldata: Bytes) -> Result<B256> {
        if !self.has_code(to) {
            anyhow::bail!("Transaction reverted: no contract deployed at {}", to);
        }

        let (nonce, tx_hash) = self.submit(from, Some(to), calldata);
        tracing::trace!(%from, nonce, %to, %tx_hash, "Simulated transaction");
        Ok(tx_hash)
    }
}
