//! Airdrop replay
//!
//! Sums the amounts each recipient received through `airdropERC20` calls for
//! one token. Recipients and amounts are paired by position.

use crate::abi::{decode_airdrop_call, AirDrop::AirDropCalls};
use crate::replay::{ApplyOutcome, ReplayPolicy};
use crate::state::BalanceMap;
use crate::types::TransactionRecord;
use alloy_primitives::Address;
use anyhow::Result;
use tracing::debug;

/// Replays `airdropERC20(token, recipients[], amounts[])` calls for `token`.
pub struct AirdropPolicy {
    contract: Address,
    token: Address,
}

impl AirdropPolicy {
    pub fn new(contract: Address, token: Address) -> Self {
        Self { contract, token }
    }
}

impl ReplayPolicy for AirdropPolicy {
    type State = BalanceMap;

    fn name(&self) -> &'static str {
        "airdrop"
    }

    fn target(&self) -> Address {
        self.contract
    }

    fn initial_state(&self) -> BalanceMap {
        BalanceMap::new()
    }

    fn apply(&self, state: &mut BalanceMap, record: &TransactionRecord) -> Result<ApplyOutcome> {
        let call = match decode_airdrop_call(&record.input) {
            Ok(call) => call,
            Err(err) => return Ok(ApplyOutcome::Undecodable(err)),
        };

        let AirDropCalls::airdropERC20(call) = call;
        if call.token != self.token {
            return Ok(ApplyOutcome::Filtered);
        }

        debug!(
            block = record.block_number,
            recipients = call.recipients.len(),
            "Found airdropERC20 transaction {:?}",
            record.hash
        );
        for (recipient, amount) in call.recipients.iter().zip(call.amounts.iter()) {
            state.credit(*recipient, *amount)?;
        }
        Ok(ApplyOutcome::Applied)
    }
}
