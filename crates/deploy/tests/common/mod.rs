//! Shared test infrastructure: an in-memory chain and artifact fixtures.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{Arc, Mutex},
};

use alloy_core::{
    primitives::{Address, B256, Bytes, U256},
    sol_types::SolCall,
};
use anyhow::Result;
use futures::{FutureExt, future::BoxFuture};
use pocdeploy_core::{ChainClient, DeployReceipt, DeployRequest, IPoc, NetworkContext};
use tempdir::TempDir;
use tokio::sync::Barrier;

pub const CHAIN_ID: u64 = 31337;

/// Creation bytecode written to the POC fixture artifact.
pub const POC_BYTECODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x01];
/// Creation bytecode written to the POCAuction fixture artifact.
pub const AUCTION_BYTECODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x02];

/// The address the mock assigns to its `n`-th deployment (1-based).
pub fn deployed_address(n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(0xC0_0000 + n).to_be_bytes());
    Address::from(bytes)
}

pub fn account(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// A chain that deploys instantly, remembers which addresses hold code and
/// serves `balanceOf` from a table.
pub struct MockChain {
    accounts: Vec<Address>,
    balances: HashMap<Address, U256>,
    failing_accounts: HashSet<Address>,
    failing_deploy: Option<usize>,
    balance_barrier: Option<Arc<Barrier>>,
    deployments: Mutex<Vec<DeployRequest>>,
    contracts: Mutex<HashSet<Address>>,
}

impl MockChain {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            balances: HashMap::new(),
            failing_accounts: HashSet::new(),
            failing_deploy: None,
            balance_barrier: None,
            deployments: Mutex::new(Vec::new()),
            contracts: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_balance(mut self, account: Address, balance: u64) -> Self {
        self.balances.insert(account, U256::from(balance));
        self
    }

    /// `balanceOf(account)` reverts.
    pub fn with_failing_account(mut self, account: Address) -> Self {
        self.failing_accounts.insert(account);
        self
    }

    /// The `n`-th deployment (1-based) fails.
    pub fn with_failing_deploy(mut self, n: usize) -> Self {
        self.failing_deploy = Some(n);
        self
    }

    /// Hold every `balanceOf` call until `parties` of them are in flight.
    pub fn with_balance_barrier(mut self, parties: usize) -> Self {
        self.balance_barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn deployments(&self) -> Vec<DeployRequest> {
        self.deployments.lock().unwrap().clone()
    }

    pub async fn network(&self) -> NetworkContext {
        NetworkContext::resolve("localhost", self, None)
            .await
            .expect("mock network resolves")
    }
}

impl ChainClient for MockChain {
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>> {
        async { Ok(CHAIN_ID) }.boxed()
    }

    fn accounts(&self) -> BoxFuture<'_, Result<Vec<Address>>> {
        async move { Ok(self.accounts.clone()) }.boxed()
    }

    fn deploy(&self, request: DeployRequest) -> BoxFuture<'_, Result<DeployReceipt>> {
        async move {
            let n = {
                let mut deployments = self.deployments.lock().unwrap();
                deployments.push(request);
                deployments.len()
            };

            if self.failing_deploy == Some(n) {
                anyhow::bail!("insufficient funds for gas * price + value");
            }

            let contract_address = deployed_address(n as u64);
            self.contracts.lock().unwrap().insert(contract_address);

            Ok(DeployReceipt {
                contract_address,
                transaction_hash: B256::with_last_byte(n as u8),
                block_number: Some(n as u64),
                gas_used: Some(100_000),
            })
        }
        .boxed()
    }

    fn code(&self, address: Address) -> BoxFuture<'_, Result<Bytes>> {
        async move {
            if self.contracts.lock().unwrap().contains(&address) {
                Ok(Bytes::from_static(&[0x60, 0x80]))
            } else {
                Ok(Bytes::new())
            }
        }
        .boxed()
    }

    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, Result<Bytes>> {
        async move {
            if data.len() < 4 || data[..4] != IPoc::balanceOfCall::SELECTOR {
                anyhow::bail!("execution reverted: unsupported call to {}", to);
            }

            let call = IPoc::balanceOfCall::abi_decode(&data, true)?;

            if let Some(barrier) = &self.balance_barrier {
                barrier.wait().await;
            }

            if self.failing_accounts.contains(&call.account) {
                anyhow::bail!("execution reverted");
            }

            let balance = self.balances.get(&call.account).copied().unwrap_or_default();
            Ok(Bytes::from(balance.to_be_bytes::<32>().to_vec()))
        }
        .boxed()
    }
}

/// A temporary directory holding POC and POCAuction artifacts.
pub fn artifacts_dir() -> TempDir {
    let dir = TempDir::new("pocdeploy-artifacts").expect("Failed to create temp dir");
    write_artifact(dir.path(), "POC", POC_BYTECODE);
    write_artifact(dir.path(), "POCAuction", AUCTION_BYTECODE);
    dir
}

fn write_artifact(dir: &Path, name: &str, bytecode: &[u8]) {
    let artifact = serde_json::json!({
        "contractName": name,
        "abi": [],
        "bytecode": format!("0x{}", hex::encode(bytecode)),
    });
    std::fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_string_pretty(&artifact).unwrap(),
    )
    .expect("Failed to write artifact");
}
