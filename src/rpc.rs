//! JSON-RPC client for Ethereum nodes
//!
//! Only a few calls are needed: the current block height (default end of a
//! replay range) and, for block-scan mode, full blocks and receipts.

use crate::types::{Block, Receipt};
use alloy_primitives::B256;
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// JSON-RPC client for Ethereum nodes.
#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error from {}: {}", method, error);
        }

        json.get("result")
            .cloned()
            .context("RPC response missing 'result' field")
    }

    /// Get the block number for a block tag such as "latest" or "finalized".
    pub async fn get_block_number(&self, block: &str) -> Result<u64> {
        let params = json!([block, false]);
        let result = self.call("eth_getBlockByNumber", params).await?;

        let number_str = result
            .get("number")
            .and_then(|v| v.as_str())
            .with_context(|| format!("Block '{}' missing 'number' field", block))?;

        let number_str = number_str.strip_prefix("0x").unwrap_or(number_str);
        if number_str.is_empty() {
            anyhow::bail!("Block number is empty");
        }
        u64::from_str_radix(number_str, 16).context("Failed to parse block number")
    }

    /// Get a block by number with full transaction objects.
    ///
    /// Returns `None` when the node does not know the block.
    pub async fn get_block_with_transactions(&self, number: u64) -> Result<Option<Block>> {
        let params = json!([format!("0x{:x}", number), true]);
        let result = self.call("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .with_context(|| format!("Failed to deserialize block {}", number))
    }

    /// Get a transaction receipt by hash.
    ///
    /// Returns `None` when the node has no receipt for the hash.
    pub async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        let params = json!([format!("0x{:x}", tx_hash)]);
        let result = self.call("eth_getTransactionReceipt", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .with_context(|| format!("Failed to deserialize receipt for {:?}", tx_hash))
    }
}
