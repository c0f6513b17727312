//! Context passed explicitly to deployment steps and inspection.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use anyhow::Context;

use crate::{
    chain::ChainClient,
    error::DeployResult,
    record::DeployedContract,
    store::DeploymentRecordStore,
};

/// Identity of the network a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    /// Network name, also the record store directory.
    pub name: String,
    pub chain_id: u64,
    /// The account deployments are sent from.
    pub deployer: Address,
    /// The node's accounts, in index order.
    pub accounts: Vec<Address>,
}

impl NetworkContext {
    /// Query the chain for its id and accounts.
    ///
    /// The deployer defaults to the first account (index 0).
    pub async fn resolve(
        name: impl Into<String>,
        chain: &dyn ChainClient,
        deployer: Option<Address>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let chain_id = chain
            .chain_id()
            .await
            .with_context(|| format!("Failed to query chain id of network {}", name))?;
        let accounts = chain
            .accounts()
            .await
            .with_context(|| format!("Failed to list accounts of network {}", name))?;

        let deployer = match deployer {
            Some(deployer) => deployer,
            None => *accounts.first().with_context(|| {
                format!(
                    "Network {} exposes no accounts and no deployer was configured",
                    name
                )
            })?,
        };

        tracing::info!(network = %name, chain_id, deployer = %deployer, accounts = accounts.len(), "Resolved network");

        Ok(Self {
            name,
            chain_id,
            deployer,
            accounts,
        })
    }
}

/// What a running step can see: read access to the records deployed so far,
/// the network identity and the chain client.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Name of the step being run.
    pub step: &'a str,
    pub network: &'a NetworkContext,
    pub chain: &'a dyn ChainClient,
    store: &'a DeploymentRecordStore,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        step: &'a str,
        network: &'a NetworkContext,
        chain: &'a dyn ChainClient,
        store: &'a DeploymentRecordStore,
    ) -> Self {
        Self {
            step,
            network,
            chain,
            store,
        }
    }

    /// The record deployed under `name`, or [`crate::DeployError::NotFound`].
    pub fn get(&self, name: &str) -> DeployResult<&'a DeployedContract> {
        self.store.get(name)
    }

    /// Snapshot of every record deployed so far on this network.
    pub fn all(&self) -> BTreeMap<String, DeployedContract> {
        self.store.all()
    }

    pub fn deployer(&self) -> Address {
        self.network.deployer
    }
}
