//! Log replay engine
//!
//! Folds an ordered stream of transaction records into one accumulator.
//! What the accumulator is, and which calls change it, is decided by a
//! [`ReplayPolicy`]; the engine owns the filtering common to every policy
//! (successful transactions addressed to the policy's contract) and the
//! diagnostics.
//!
//! The accumulator is created and owned by the fold and only handed out once
//! the stream is exhausted, so nothing else can observe or mutate a
//! half-replayed state.

use crate::types::TransactionRecord;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt};
use tracing::{debug, info, warn};

/// What happened when a policy looked at a candidate record.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// The call changed the accumulator.
    Applied,
    /// The tracked function was called, but its arguments rule it out
    /// (e.g. an airdrop of a different token).
    Filtered,
    /// The input decoded to another function of the interface.
    OtherCall(&'static str),
    /// The input does not decode against the interface.
    Undecodable(alloy_sol_types::Error),
}

/// How one kind of derived state is rebuilt from call history.
pub trait ReplayPolicy {
    /// Accumulator produced by the replay.
    type State;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Contract whose incoming calls are replayed.
    fn target(&self) -> Address;

    /// Accumulator before the first record is applied.
    fn initial_state(&self) -> Self::State;

    /// Decode `record` and apply it to `state` if it is a tracked call.
    ///
    /// Only called for successful transactions sent to [`Self::target`].
    /// An error aborts the replay.
    fn apply(&self, state: &mut Self::State, record: &TransactionRecord) -> Result<ApplyOutcome>;
}

/// Counters describing one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records read from the stream
    pub records: u64,
    /// Failed transactions or transactions to another address
    pub skipped: u64,
    /// Tracked calls applied to the accumulator
    pub applied: u64,
    /// Tracked calls ruled out by their arguments
    pub filtered: u64,
    /// Other functions of the interface
    pub other_calls: u64,
    /// Inputs that did not decode
    pub undecodable: u64,
    /// Block of the last record read
    pub last_block: Option<u64>,
}

/// Replays a record stream through a policy.
pub struct LogReplayEngine<P> {
    policy: P,
}

impl<P: ReplayPolicy> LogReplayEngine<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Consume `records` in order and return the final accumulator.
    ///
    /// A stream error or a failed apply aborts the replay and the partial
    /// state is dropped.
    pub async fn run<S>(&self, records: S) -> Result<(P::State, ReplaySummary)>
    where
        S: Stream<Item = Result<TransactionRecord>>,
    {
        let target = self.policy.target();
        let mut state = self.policy.initial_state();
        let mut summary = ReplaySummary::default();

        info!(policy = self.policy.name(), target = %target, "Starting replay");

        futures::pin_mut!(records);
        while let Some(record) = records.try_next().await? {
            summary.records += 1;
            if let Some(last) = summary.last_block {
                if record.block_number < last {
                    warn!(
                        "Record {:?} in block {} arrived after block {}",
                        record.hash, record.block_number, last
                    );
                }
            }
            summary.last_block = Some(record.block_number);

            if !record.is_successful_call_to(target) {
                summary.skipped += 1;
                continue;
            }

            let outcome = self
                .policy
                .apply(&mut state, &record)
                .with_context(|| format!("Failed to apply transaction {:?}", record.hash))?;
            match outcome {
                ApplyOutcome::Applied => summary.applied += 1,
                ApplyOutcome::Filtered => summary.filtered += 1,
                ApplyOutcome::OtherCall(signature) => {
                    debug!("Skipping {} call in transaction {:?}", signature, record.hash);
                    summary.other_calls += 1;
                }
                ApplyOutcome::Undecodable(err) => {
                    warn!(
                        block = record.block_number,
                        method_id = record.method_id.as_deref().unwrap_or("-"),
                        "Could not parse transaction {:?}: {}",
                        record.hash,
                        err
                    );
                    summary.undecodable += 1;
                }
            }
        }

        info!(
            policy = self.policy.name(),
            records = summary.records,
            applied = summary.applied,
            filtered = summary.filtered,
            other_calls = summary.other_calls,
            undecodable = summary.undecodable,
            skipped = summary.skipped,
            "Replay complete"
        );

        Ok((state, summary))
    }
}
