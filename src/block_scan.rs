//! Block-by-block transaction scan through node RPC
//!
//! Slower alternative to the archive API: walks every block in the range,
//! picks transactions sent from or to the watched address, and fetches
//! their receipts concurrently. A block's records are yielded only after all
//! of its receipts are in, so the replay still sees them in block order.

use crate::concurrency::ConcurrencyLimiter;
use crate::fetcher::TxListQuery;
use crate::rpc::RpcClient;
use crate::types::{Block, Transaction, TransactionRecord};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_stream::try_stream;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Scans blocks through a node and turns relevant transactions into records.
pub struct BlockScanner {
    rpc: RpcClient,
    limiter: ConcurrencyLimiter,
    cancel: CancellationToken,
}

impl BlockScanner {
    /// Create a scanner fetching up to `limiter.limit()` receipts at once.
    ///
    /// Cancelling `cancel` stops the scan before the next block and aborts
    /// in-flight receipt fetches.
    pub fn new(rpc: RpcClient, limiter: ConcurrencyLimiter, cancel: CancellationToken) -> Self {
        Self {
            rpc,
            limiter,
            cancel,
        }
    }

    /// Stream every transaction touching `query.address` in the block range.
    ///
    /// Blocks the node does not return are logged and skipped, as are
    /// transactions without a receipt.
    pub fn transactions(
        &self,
        query: TxListQuery,
    ) -> impl Stream<Item = Result<TransactionRecord>> + '_ {
        try_stream! {
            info!(
                address = %query.address,
                start_block = query.start_block,
                end_block = query.end_block,
                concurrency = self.limiter.limit(),
                "Scanning blocks"
            );
            for block_num in query.start_block..=query.end_block {
                if self.cancel.is_cancelled() {
                    Err::<(), _>(anyhow::anyhow!("Block scan cancelled before block {}", block_num))?;
                }
                let block = self
                    .rpc
                    .get_block_with_transactions(block_num)
                    .await
                    .with_context(|| format!("Failed to fetch block {}", block_num))?;

                let Some(block) = block else {
                    error!("Could not fetch block {}", block_num);
                    continue;
                };

                let records = self.block_records(&block, query.address).await?;
                debug!(
                    block = block_num,
                    transactions = block.transactions.len(),
                    relevant = records.len(),
                    "Checked block {} of {}",
                    block_num,
                    query.end_block
                );

                for record in records {
                    yield record;
                }
            }
        }
    }

    /// Fetch receipts for the block's relevant transactions and build records.
    async fn block_records(&self, block: &Block, address: Address) -> Result<Vec<TransactionRecord>> {
        let candidates: Vec<&Transaction> = block
            .transactions
            .iter()
            .filter(|tx| tx.from == address || tx.to == Some(address))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let factories: Vec<_> = candidates
            .iter()
            .map(|tx| {
                let rpc = &self.rpc;
                let hash = tx.hash;
                move |token: CancellationToken| async move {
                    tokio::select! {
                        _ = token.cancelled() => anyhow::bail!("Receipt fetch for {:?} cancelled", hash),
                        receipt = rpc.get_transaction_receipt(hash) => {
                            receipt.with_context(|| format!("Failed to fetch receipt for tx {:?}", hash))
                        }
                    }
                }
            })
            .collect();

        let receipts = self
            .limiter
            .try_run(factories, &self.cancel)
            .await
            .with_context(|| format!("Failed to fetch receipts for block {}", block.number))?;

        let mut records = Vec::with_capacity(candidates.len());
        for (tx, receipt) in candidates.into_iter().zip(receipts) {
            match receipt {
                Some(receipt) => records.push(TransactionRecord::from_rpc(block, tx, &receipt)),
                None => error!("Could not fetch receipt for transaction {:?}", tx.hash),
            }
        }
        Ok(records)
    }
}
