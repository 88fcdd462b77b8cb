//! CLI implementation for txfold
//!
//! Each subcommand replays one contract's call history and prints the
//! rebuilt state to stdout. Diagnostics go to stderr through `tracing`.

use crate::block_scan::BlockScanner;
use crate::concurrency::ConcurrencyLimiter;
use crate::config::{
    load_address_list, parse_address, AIRDROP_ADDRESS, CONSTRUCTOR_ALLOWED, DEFAULT_ARCHIVE_URL,
    DEFAULT_CONCURRENCY, DEFAULT_RPC_URL, DEPLOYMENT_BLOCK, PSYOP_ADDRESS,
};
use crate::fetcher::{ArchiveClient, NoResultsPolicy, PaginatedLogFetcher, TxListQuery};
use crate::output::{self, OutputFormat};
use crate::replay::{LogReplayEngine, ReplayPolicy};
use crate::replay_airdrop::AirdropPolicy;
use crate::replay_allowlist::AllowListPolicy;
use crate::rpc::RpcClient;
use crate::stats::{MedianOrder, Stats};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Rebuild contract state by replaying its transaction history
#[derive(Parser, Debug)]
#[command(name = "txfold")]
#[command(about = "Rebuild contract state by replaying its transaction history")]
pub struct Cli {
    /// Etherscan API key (archive source only)
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true, default_value = "")]
    etherscan_api_key: String,

    /// Etherscan-compatible archive API endpoint
    #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
    etherscan_url: String,

    /// RPC endpoint URL, used for the default end block and block scans
    #[arg(short, long, env = "ETH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// First block of the replay range
    #[arg(long, default_value_t = DEPLOYMENT_BLOCK)]
    start_block: u64,

    /// Last block of the replay range (default: current node height)
    #[arg(long)]
    end_block: Option<u64>,

    /// Where transaction history is read from
    #[arg(long, value_enum, default_value_t = Source::Archive)]
    source: Source,

    /// Receipts fetched at once in block-scan mode
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// How an archive "No transactions found" answer is treated
    #[arg(long, value_enum, default_value_t = NoResultsPolicy::Fatal)]
    no_results: NoResultsPolicy,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Transaction history source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Paginated Etherscan `txlist` queries
    Archive,
    /// Every block in the range through node RPC
    Blocks,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the token allow-list from setAddressToWhiteList calls
    Allowlist {
        /// Token contract address
        #[arg(long, default_value_t = PSYOP_ADDRESS, value_parser = parse_address)]
        contract: Address,
        /// File of addresses allowed at deployment (one per line);
        /// defaults to the constructor grants
        #[arg(long)]
        seeds: Option<PathBuf>,
    },
    /// Sum airdropERC20 amounts per recipient
    Airdrop {
        /// Airdrop contract address
        #[arg(long, default_value_t = AIRDROP_ADDRESS, value_parser = parse_address)]
        contract: Address,
        /// Only airdrops of this token are counted
        #[arg(long, default_value_t = PSYOP_ADDRESS, value_parser = parse_address)]
        token: Address,
        /// Ordering of amounts before the median is picked
        #[arg(long, value_enum, default_value_t = MedianOrder::Lexicographic)]
        median_order: MedianOrder,
    },
}

/// Settings shared by both history sources.
struct SourceSettings {
    source: Source,
    etherscan_url: String,
    etherscan_api_key: String,
    concurrency: usize,
    no_results: NoResultsPolicy,
    start_block: u64,
    end_block: u64,
    cancel: CancellationToken,
}

impl SourceSettings {
    fn query(&self, address: Address) -> TxListQuery {
        TxListQuery {
            address,
            start_block: self.start_block,
            end_block: self.end_block,
        }
    }
}

/// Replay the target contract's history from the configured source.
async fn replay<P: ReplayPolicy>(
    settings: &SourceSettings,
    rpc: &RpcClient,
    policy: P,
) -> Result<P::State> {
    let engine = LogReplayEngine::new(policy);
    let query = settings.query(engine.policy().target());

    let (state, summary) = match settings.source {
        Source::Archive => {
            if settings.etherscan_api_key.is_empty() {
                anyhow::bail!("An Etherscan API key is required (--etherscan-api-key or ETHERSCAN_API_KEY)");
            }
            let client = ArchiveClient::new(
                settings.etherscan_url.clone(),
                settings.etherscan_api_key.clone(),
            );
            let fetcher = PaginatedLogFetcher::new(client).with_no_results(settings.no_results);
            tokio::select! {
                biased;
                _ = settings.cancel.cancelled() => anyhow::bail!("Archive fetch cancelled"),
                outcome = engine.run(fetcher.transactions(query)) => outcome?,
            }
        }
        Source::Blocks => {
            let limiter = ConcurrencyLimiter::new(settings.concurrency)?;
            let scanner = BlockScanner::new(rpc.clone(), limiter, settings.cancel.clone());
            engine.run(scanner.transactions(query)).await?
        }
    };

    if summary.undecodable > 0 {
        warn!("{} transaction(s) could not be parsed", summary.undecodable);
    }
    Ok(state)
}

/// Run the parsed command. Cancelling `cancel` aborts the replay with an error.
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let rpc = RpcClient::new(cli.rpc_url.clone());

    let end_block = match cli.end_block {
        Some(block) => block,
        None => rpc
            .get_block_number("latest")
            .await
            .context("Failed to get latest block number")?,
    };
    if cli.start_block > end_block {
        anyhow::bail!(
            "Start block {} is after end block {}",
            cli.start_block,
            end_block
        );
    }
    info!("Checking blocks {} to {}", cli.start_block, end_block);

    let settings = SourceSettings {
        source: cli.source,
        etherscan_url: cli.etherscan_url,
        etherscan_api_key: cli.etherscan_api_key,
        concurrency: cli.concurrency,
        no_results: cli.no_results,
        start_block: cli.start_block,
        end_block,
        cancel,
    };
    let stdout = std::io::stdout();

    match cli.command {
        Commands::Allowlist { contract, seeds } => {
            let seeds = match seeds {
                Some(path) => load_address_list(&path)
                    .with_context(|| format!("Failed to load seeds from {:?}", path))?,
                None => CONSTRUCTOR_ALLOWED.to_vec(),
            };
            let state = replay(&settings, &rpc, AllowListPolicy::new(contract, seeds)).await?;
            info!("{} allowed address(es)", state.len());
            output::write_allow_list(stdout.lock(), &state, cli.format)?;
        }
        Commands::Airdrop {
            contract,
            token,
            median_order,
        } => {
            let balances = replay(&settings, &rpc, AirdropPolicy::new(contract, token)).await?;
            let stats = if balances.is_empty() {
                warn!("No airdrop of token {} found", token);
                None
            } else {
                Some(Stats::from_balances_with(&balances, median_order)?)
            };
            info!("{} recipient(s)", balances.len());
            output::write_airdrop(stdout.lock(), &balances, stats.as_ref(), cli.format)?;
        }
    }

    Ok(())
}
