//! Ethereum JSON-RPC client used as the production [`ChainClient`].

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::chain::{ChainClient, DeployReceipt, DeployRequest};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between receipt polling attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    parse_rpc_response(method, result)
}

/// Extract the `result` member of a JSON-RPC response, surfacing `error` members.
fn parse_rpc_response<T: DeserializeOwned>(method: &str, response: Value) -> Result<T, anyhow::Error> {
    if let Some(error) = response.get("error") {
        anyhow::bail!(
            "RPC error from {}: {}",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = response
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Parse a hex-encoded JSON-RPC quantity (`0x`-prefixed).
pub fn parse_quantity(value: &str) -> Result<u64, anyhow::Error> {
    let digits = value
        .strip_prefix("0x")
        .with_context(|| format!("Quantity is not 0x-prefixed: {}", value))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid hex quantity: {}", value))
}

/// Receipt fields read after a contract creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    contract_address: Option<Address>,
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

impl TransactionReceipt {
    fn into_deploy_receipt(self) -> Result<DeployReceipt, anyhow::Error> {
        if self.status.as_deref() == Some("0x0") {
            anyhow::bail!(
                "Contract creation reverted in transaction {}",
                self.transaction_hash
            );
        }

        let contract_address = self.contract_address.with_context(|| {
            format!(
                "Receipt for {} carries no contract address",
                self.transaction_hash
            )
        })?;

        Ok(DeployReceipt {
            contract_address,
            transaction_hash: self.transaction_hash,
            block_number: self.block_number.as_deref().map(parse_quantity).transpose()?,
            gas_used: self.gas_used.as_deref().map(parse_quantity).transpose()?,
        })
    }
}

/// A [`ChainClient`] speaking JSON-RPC over HTTP to a node with unlocked accounts.
#[derive(Debug, Clone)]
pub struct RpcChain {
    client: reqwest::Client,
    url: Url,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChain {
    pub fn new(url: Url, receipt_timeout: Duration) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: create_client()?,
            url,
            receipt_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, anyhow::Error> {
        json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    /// Poll `eth_getTransactionReceipt` until the transaction is mined or the timeout elapses.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<DeployReceipt, anyhow::Error> {
        let client = &self.client;
        let url = self.url.as_str();
        let attempts = (self.receipt_timeout.as_millis() / self.poll_interval.as_millis().max(1))
            .max(1) as usize;

        let poll = (move || async move {
            let receipt: Option<TransactionReceipt> = json_rpc_call(
                client,
                url,
                "eth_getTransactionReceipt",
                vec![serde_json::json!(tx_hash)],
            )
            .await?;
            receipt.context("Transaction not mined yet")
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(self.poll_interval)
                .with_max_times(attempts),
        )
        .notify(|err, after| {
            tracing::trace!(error = %err, tx_hash = %tx_hash, retry_in = ?after, "Receipt not available, retrying...");
        });

        // The deadline covers request time as well as the polling delays.
        let receipt = tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(anyhow::Error::from)
            .and_then(|polled| polled)
            .with_context(|| {
                format!(
                    "Timed out after {:?} waiting for receipt of {}",
                    self.receipt_timeout, tx_hash
                )
            })?;

        receipt.into_deploy_receipt()
    }
}

impl ChainClient for RpcChain {
    fn chain_id(&self) -> BoxFuture<'_, anyhow::Result<u64>> {
        async move {
            let chain_id: String = self.rpc("eth_chainId", vec![]).await?;
            parse_quantity(&chain_id)
        }
        .boxed()
    }

    fn accounts(&self) -> BoxFuture<'_, anyhow::Result<Vec<Address>>> {
        async move { self.rpc("eth_accounts", vec![]).await }.boxed()
    }

    fn deploy(&self, request: DeployRequest) -> BoxFuture<'_, anyhow::Result<DeployReceipt>> {
        async move {
            let tx_hash: B256 = self
                .rpc(
                    "eth_sendTransaction",
                    vec![serde_json::json!({
                        "from": request.from,
                        "data": request.init_code,
                    })],
                )
                .await
                .context("Failed to send contract creation transaction")?;

            tracing::debug!(tx_hash = %tx_hash, from = %request.from, "Contract creation sent");

            self.wait_for_receipt(tx_hash).await
        }
        .boxed()
    }

    fn code(&self, address: Address) -> BoxFuture<'_, anyhow::Result<Bytes>> {
        async move {
            self.rpc(
                "eth_getCode",
                vec![serde_json::json!(address), serde_json::json!("latest")],
            )
            .await
        }
        .boxed()
    }

    fn call(&self, to: Address, data: Bytes) -> BoxFuture<'_, anyhow::Result<Bytes>> {
        async move {
            self.rpc(
                "eth_call",
                vec![
                    serde_json::json!({ "to": to, "data": data }),
                    serde_json::json!("latest"),
                ],
            )
            .await
        }
        .boxed()
    }
}
