//! txfold - rebuild derived contract state by replaying transaction history
//!
//! Transaction history comes either from a paginated archive API
//! ([`fetcher`]) or from a block-by-block node scan ([`block_scan`]). The
//! [`replay`] engine folds it through a policy into an accumulator: the
//! token allow-list ([`replay_allowlist`]) or per-recipient airdrop totals
//! ([`replay_airdrop`]).

pub mod abi;
pub mod block_scan;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod replay;
pub mod replay_airdrop;
pub mod replay_allowlist;
pub mod retry;
pub mod rpc;
pub mod state;
pub mod stats;
pub mod types;

// Re-export the main types for convenience
pub use concurrency::ConcurrencyLimiter;
pub use fetcher::{ArchiveClient, NoResultsPolicy, PageSource, PaginatedLogFetcher, TxListQuery};
pub use replay::{ApplyOutcome, LogReplayEngine, ReplayPolicy, ReplaySummary};
pub use retry::RetryPolicy;
pub use state::{AllowListState, BalanceMap};
pub use stats::Stats;
pub use types::TransactionRecord;
