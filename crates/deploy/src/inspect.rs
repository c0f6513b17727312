//! Read-only inspection of a network's deployments.
//!
//! Balance queries for all accounts are launched together and joined; every
//! account appears in the report with either its balance or its error.

use std::{collections::BTreeMap, fmt};

use alloy_core::primitives::{Address, U256};
use anyhow::Context;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use futures::future::join_all;
use serde::Serialize;

use crate::{
    chain::ChainClient,
    contracts::{PocAuction, PocToken, TokenMetadata},
    error::{DeployError, DeployResult},
    record::DeployedContract,
    store::DeploymentRecordStore,
};

/// One account's balance query outcome.
#[derive(Debug)]
pub struct AccountBalance {
    pub account: Address,
    pub balance: DeployResult<U256>,
}

/// Outcome of an inspection run.
#[derive(Debug)]
pub struct InspectionReport {
    pub network: String,
    pub contracts: BTreeMap<String, DeployedContract>,
    pub token: PocToken,
    pub auction: PocAuction,
    pub metadata: Option<TokenMetadata>,
    /// One entry per requested account, in request order.
    pub balances: Vec<AccountBalance>,
}

impl InspectionReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Address, &DeployError)> {
        self.balances
            .iter()
            .filter_map(|entry| entry.balance.as_ref().err().map(|err| (&entry.account, err)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    fn symbol(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.symbol.as_str())
            .unwrap_or("POC")
    }

    /// A JSON view of the report.
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct BalanceView<'a> {
            account: &'a Address,
            #[serde(skip_serializing_if = "Option::is_none")]
            balance: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<String>,
        }

        let balances: Vec<_> = self
            .balances
            .iter()
            .map(|entry| BalanceView {
                account: &entry.account,
                balance: entry.balance.as_ref().ok().map(ToString::to_string),
                error: entry.balance.as_ref().err().map(ToString::to_string),
            })
            .collect();

        serde_json::json!({
            "network": self.network,
            "contracts": self.contracts,
            "symbol": self.symbol(),
            "balances": balances,
        })
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut contracts = Table::new();
        contracts
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["Contract", "Address", "Tx"]);
        for (name, record) in &self.contracts {
            contracts.add_row(vec![
                name.clone(),
                record.address.to_string(),
                record
                    .transaction_hash
                    .map(|hash| hash.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]);
        }

        let symbol = self.symbol();
        let mut balances = Table::new();
        balances
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["Account".to_string(), format!("Balance ({symbol})")]);
        for entry in &self.balances {
            let cell = match &entry.balance {
                Ok(balance) => balance.to_string(),
                Err(err) => format!("error: {err}"),
            };
            balances.add_row(vec![entry.account.to_string(), cell]);
        }

        writeln!(f, "Network: {}", self.network)?;
        writeln!(f, "{contracts}")?;
        write!(f, "{balances}")
    }
}

/// The accounts an inspection reports on: `requested` when non-empty, otherwise
/// every account the node manages.
///
/// Unlike [`crate::NetworkContext::resolve`] this needs no deployer, so nodes
/// exposing no accounts can still be inspected for explicit accounts.
pub async fn inspection_accounts(
    chain: &dyn ChainClient,
    requested: &[Address],
) -> anyhow::Result<Vec<Address>> {
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }

    let accounts = chain
        .accounts()
        .await
        .context("Failed to list the node's accounts")?;
    if accounts.is_empty() {
        tracing::warn!("The node exposes no accounts; pass --accounts to choose which to report");
    }
    Ok(accounts)
}

/// Reads deployments and per-account state from a network.
pub struct Inspector<'a> {
    store: &'a DeploymentRecordStore,
    chain: &'a dyn ChainClient,
}

impl<'a> Inspector<'a> {
    pub fn new(store: &'a DeploymentRecordStore, chain: &'a dyn ChainClient) -> Self {
        Self { store, chain }
    }

    /// Bind the POC and POCAuction handles, then query every account's POC balance.
    ///
    /// Missing records fail with [`DeployError::NotFound`]. Failed balance queries
    /// do not fail the call; they are kept in [`InspectionReport::balances`].
    pub async fn inspect(&self, accounts: &[Address]) -> DeployResult<InspectionReport> {
        let token = PocToken::from_store(self.store)?;
        let auction = PocAuction::from_store(self.store)?;

        tracing::info!(
            network = self.store.network(),
            token = %token.address,
            auction = %auction.address,
            accounts = accounts.len(),
            "Inspecting deployment..."
        );

        let metadata = match token.metadata(self.chain).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read POC token metadata");
                None
            }
        };

        let queries = accounts.iter().map(move |&account| async move {
            let balance = token.balance_of(self.chain, account).await;
            match &balance {
                Ok(balance) => tracing::debug!(account = %account, balance = %balance, "Balance queried"),
                Err(err) => tracing::error!(account = %account, error = %err, "Balance query failed"),
            }
            AccountBalance { account, balance }
        });
        let balances = join_all(queries).await;

        Ok(InspectionReport {
            network: self.store.network().to_string(),
            contracts: self.store.all(),
            token,
            auction,
            metadata,
            balances,
        })
    }
}
