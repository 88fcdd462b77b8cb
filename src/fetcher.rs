//! Paginated transaction history from the archive API
//!
//! Produces every transaction touching an address inside an inclusive block
//! range, lazily and in archive order (ascending block, then intra-block
//! order). Pages are requested one at a time: a page's records are yielded
//! as soon as it is decoded and the next page is only requested once the
//! consumer has drained them.
//!
//! Each page request goes through [`RetryPolicy`]. A non-success status in
//! the response envelope is a logical failure and ends the stream without
//! retrying.

use crate::retry::RetryPolicy;
use crate::types::{ArchiveResponse, TransactionRecord};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_stream::try_stream;
use futures::Stream;
use std::future::Future;
use tracing::{debug, info};

/// Rows requested per page (`offset` query parameter).
pub const PAGE_SIZE: usize = 5000;

/// Message the archive sends alongside status "0" when a range has no rows.
pub const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

/// How to treat a non-success response that only says the range is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum NoResultsPolicy {
    /// Every non-success status aborts the fetch.
    #[default]
    Fatal,
    /// "No transactions found" ends the stream as an empty final page.
    Empty,
}

/// Address and inclusive block range to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxListQuery {
    pub address: Address,
    pub start_block: u64,
    pub end_block: u64,
}

/// Anything that can serve numbered `txlist` pages.
pub trait PageSource {
    /// Fetch page `page` (1-based) of `page_size` rows.
    fn fetch_page(
        &self,
        query: &TxListQuery,
        page: u32,
        page_size: usize,
    ) -> impl Future<Output = Result<ArchiveResponse>>;
}

/// HTTP client for an Etherscan-compatible `account/txlist` endpoint.
pub struct ArchiveClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ArchiveClient {
    /// Create a client for `base_url` (e.g. `https://api.etherscan.io/api`).
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

impl PageSource for ArchiveClient {
    async fn fetch_page(
        &self,
        query: &TxListQuery,
        page: u32,
        page_size: usize,
    ) -> Result<ArchiveResponse> {
        let params = [
            ("module", "account".to_string()),
            ("action", "txlist".to_string()),
            ("address", format!("0x{:x}", query.address)),
            ("startblock", query.start_block.to_string()),
            ("endblock", query.end_block.to_string()),
            ("sort", "asc".to_string()),
            ("offset", page_size.to_string()),
            ("page", page.to_string()),
            ("apikey", self.api_key.clone()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("Failed to send archive request")?
            .error_for_status()
            .context("Archive request returned an HTTP error")?;

        response
            .json()
            .await
            .context("Failed to parse archive response")
    }
}

/// Lazily walks every page of a `txlist` query.
pub struct PaginatedLogFetcher<S> {
    source: S,
    retry: RetryPolicy,
    page_size: usize,
    no_results: NoResultsPolicy,
}

impl<S: PageSource> PaginatedLogFetcher<S> {
    /// Create a fetcher with the archive defaults: 5000-row pages,
    /// 5 retries one second apart, every non-success status fatal.
    pub fn new(source: S) -> Self {
        Self {
            source,
            retry: RetryPolicy::archive(),
            page_size: PAGE_SIZE,
            no_results: NoResultsPolicy::default(),
        }
    }

    /// Override the retry policy for page requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override how "No transactions found" responses are classified.
    pub fn with_no_results(mut self, no_results: NoResultsPolicy) -> Self {
        self.no_results = no_results;
        self
    }

    /// Stream every transaction matching `query`, in archive order.
    ///
    /// Each call starts again from page 1. The stream ends after the first
    /// page holding fewer than `page_size` rows.
    pub fn transactions(
        &self,
        query: TxListQuery,
    ) -> impl Stream<Item = Result<TransactionRecord>> + '_ {
        try_stream! {
            info!(
                address = %query.address,
                start_block = query.start_block,
                end_block = query.end_block,
                "Listing archive transactions"
            );
            let mut page = 1u32;
            loop {
                let what = format!("txlist page {}", page);
                let response = self
                    .retry
                    .run(&what, || self.source.fetch_page(&query, page, self.page_size))
                    .await?;
                let records = self.page_records(response, page)?;
                let count = records.len();
                debug!(page, count, "Fetched archive page");

                for record in records {
                    yield record;
                }

                if count < self.page_size {
                    break;
                }
                page += 1;
            }
        }
    }

    /// Check the envelope status and decode the rows of one page.
    fn page_records(&self, response: ArchiveResponse, page: u32) -> Result<Vec<TransactionRecord>> {
        if response.is_success() {
            return response
                .into_records()
                .with_context(|| format!("Failed to decode archive page {}", page));
        }

        if self.no_results == NoResultsPolicy::Empty && response.message == NO_TRANSACTIONS_MESSAGE {
            info!(page, "Archive reported no transactions, treating page as empty");
            return Ok(Vec::new());
        }

        anyhow::bail!(
            "Archive API returned error on page {}: {} ({})",
            page,
            response.message,
            response.error_detail().unwrap_or("no detail")
        );
    }
}
