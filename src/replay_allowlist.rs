//! Allow-list replay
//!
//! Rebuilds the token contract's allow-list from `setAddressToWhiteList`
//! calls. Replay starts from the constructor-granted addresses, which can be
//! removed again by a later call.

use crate::abi::{decode_psyop_call, Psyop::PsyopCalls};
use crate::replay::{ApplyOutcome, ReplayPolicy};
use crate::state::AllowListState;
use crate::types::TransactionRecord;
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use anyhow::Result;
use tracing::debug;

/// Replays `setAddressToWhiteList(address, bool)` calls.
pub struct AllowListPolicy {
    contract: Address,
    seeds: Vec<Address>,
}

impl AllowListPolicy {
    pub fn new(contract: Address, seeds: Vec<Address>) -> Self {
        Self { contract, seeds }
    }
}

impl ReplayPolicy for AllowListPolicy {
    type State = AllowListState;

    fn name(&self) -> &'static str {
        "allowlist"
    }

    fn target(&self) -> Address {
        self.contract
    }

    fn initial_state(&self) -> AllowListState {
        AllowListState::with_seeds(self.seeds.iter().copied())
    }

    fn apply(&self, state: &mut AllowListState, record: &TransactionRecord) -> Result<ApplyOutcome> {
        let call = match decode_psyop_call(&record.input) {
            Ok(call) => call,
            Err(err) => return Ok(ApplyOutcome::Undecodable(err)),
        };

        Ok(match call {
            PsyopCalls::setAddressToWhiteList(call) => {
                debug!(
                    block = record.block_number,
                    "setAddressToWhiteList({}, {}) in {:?}",
                    call.account,
                    call.allowed,
                    record.hash
                );
                state.set(call.account, call.allowed);
                ApplyOutcome::Applied
            }
            other => ApplyOutcome::OtherCall(call_signature(&other)),
        })
    }
}

/// Canonical signature of a decoded call, for diagnostics.
fn call_signature(call: &PsyopCalls) -> &'static str {
    use crate::abi::Psyop;
    match call {
        PsyopCalls::setAddressToWhiteList(_) => Psyop::setAddressToWhiteListCall::SIGNATURE,
        PsyopCalls::transfer(_) => Psyop::transferCall::SIGNATURE,
        PsyopCalls::transferFrom(_) => Psyop::transferFromCall::SIGNATURE,
        PsyopCalls::approve(_) => Psyop::approveCall::SIGNATURE,
        PsyopCalls::renounceOwnership(_) => Psyop::renounceOwnershipCall::SIGNATURE,
        PsyopCalls::transferOwnership(_) => Psyop::transferOwnershipCall::SIGNATURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Psyop;
    use crate::config::{CONSTRUCTOR_ALLOWED, PSYOP_ADDRESS};
    use crate::replay::test_support::record;
    use crate::replay::LogReplayEngine;
    use alloy_primitives::{address, U256};
    use futures::stream;

    const A: Address = address!("00000000000000000000000000000000000000aa");
    const B: Address = address!("00000000000000000000000000000000000000bb");

    fn toggle(block: u64, account: Address, allowed: bool) -> TransactionRecord {
        let input = Psyop::setAddressToWhiteListCall { account, allowed }.abi_encode();
        record(block, PSYOP_ADDRESS, input, false)
    }

    async fn replay(records: Vec<TransactionRecord>) -> AllowListState {
        let engine = LogReplayEngine::new(AllowListPolicy::new(
            PSYOP_ADDRESS,
            CONSTRUCTOR_ALLOWED.to_vec(),
        ));
        let (state, _) = engine
            .run(stream::iter(records.into_iter().map(Ok)))
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_seeds_present_before_replay() {
        let state = replay(vec![]).await;
        assert_eq!(state.len(), 2);
        for seed in CONSTRUCTOR_ALLOWED {
            assert!(state.contains(&seed));
        }
    }

    #[tokio::test]
    async fn test_last_toggle_wins() {
        let state = replay(vec![toggle(1, A, true), toggle(2, A, false), toggle(3, A, true)]).await;
        assert!(state.contains(&A));

        let state = replay(vec![toggle(1, B, true), toggle(2, B, false)]).await;
        assert!(!state.contains(&B));
    }

    #[tokio::test]
    async fn test_seed_can_be_removed() {
        let seed = CONSTRUCTOR_ALLOWED[1];
        let state = replay(vec![toggle(5, seed, false)]).await;
        assert!(!state.contains(&seed));
        assert!(state.contains(&CONSTRUCTOR_ALLOWED[0]));
    }

    #[tokio::test]
    async fn test_seed_regranted_then_removed() {
        let seed = CONSTRUCTOR_ALLOWED[0];
        let state = replay(vec![toggle(1, seed, true), toggle(2, seed, false)]).await;
        assert!(!state.contains(&seed));
    }

    #[tokio::test]
    async fn test_reverted_and_foreign_calls_ignored() {
        let mut reverted = toggle(1, A, true);
        reverted.is_error = true;
        let mut elsewhere = toggle(2, B, true);
        elsewhere.to = Some(address!("2c952eE289BbDB3aEbA329a4c41AE4C836bcc231"));

        let state = replay(vec![reverted, elsewhere]).await;
        assert!(!state.contains(&A));
        assert!(!state.contains(&B));
    }

    #[tokio::test]
    async fn test_other_calls_and_garbage_skipped() {
        let transfer = Psyop::transferCall {
            to: A,
            amount: U256::from(1u64),
        }
        .abi_encode();
        let records = vec![
            record(1, PSYOP_ADDRESS, transfer, false),
            record(2, PSYOP_ADDRESS, vec![0xff; 7], false),
            toggle(3, B, true),
        ];

        let engine = LogReplayEngine::new(AllowListPolicy::new(PSYOP_ADDRESS, vec![]));
        let (state, summary) = engine
            .run(stream::iter(records.into_iter().map(Ok)))
            .await
            .unwrap();
        assert_eq!(state.iter().copied().collect::<Vec<_>>(), vec![B]);
        assert_eq!(summary.other_calls, 1);
        assert_eq!(summary.undecodable, 1);
        assert_eq!(summary.applied, 1);
    }
}
