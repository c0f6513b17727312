//! Chain client abstraction used by deployment steps and inspection.

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;
use futures::future::BoxFuture;

/// A contract-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// The account paying for and signing the creation.
    pub from: Address,
    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub init_code: Bytes,
}

/// The mined result of a [`DeployRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    pub contract_address: Address,
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Access to a chain node.
///
/// Signing is delegated to the node: deployments are sent from one of the
/// node's unlocked accounts.
pub trait ChainClient: Send + Sync {
    /// The chain id reported by the node.
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>>;

    /// The accounts the node manages, in index order.
    fn accounts(&self) -> BoxFuture<'_, Result<Vec<Address>>>;

    /// Send a contract-creation transaction and wait until it is mined.
    fn deploy(&self, request: DeployRequest) -> BoxFuture<'_, Result<DeployReceipt>>;

    /// The runtime bytecode at `address`. Empty when no contract lives there.
    fn code(&self, address: Address) -> BoxFuture<'_, Result<Bytes>>;

    /// Execute a read-only call against `to` at the latest block.
    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, Result<Bytes>>;
}
