//! Derived state rebuilt by replay
//!
//! Both accumulators live only for one run. They are ordered by address so
//! rendering is deterministic.

use alloy_primitives::{Address, U256};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Set of addresses currently allowed by the token contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListState {
    members: BTreeSet<Address>,
}

impl AllowListState {
    /// Start from a set of addresses granted outside the replayed log.
    pub fn with_seeds(seeds: impl IntoIterator<Item = Address>) -> Self {
        Self {
            members: seeds.into_iter().collect(),
        }
    }

    /// Apply one allow-list toggle. Later calls override earlier ones.
    pub fn set(&mut self, address: Address, allowed: bool) {
        if allowed {
            self.members.insert(address);
        } else {
            self.members.remove(&address);
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }
}

/// Cumulative amount received per recipient.
///
/// Only addresses that were credited at least once are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceMap {
    balances: BTreeMap<Address, U256>,
}

impl BalanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `recipient`'s running total, starting from zero.
    ///
    /// Fails without changing the total if it would not fit in 256 bits.
    pub fn credit(&mut self, recipient: Address, amount: U256) -> Result<()> {
        let entry = self.balances.entry(recipient).or_insert(U256::ZERO);
        *entry = entry.checked_add(amount).ok_or_else(|| {
            anyhow::anyhow!("Balance of {} overflows 256 bits", recipient)
        })?;
        Ok(())
    }

    pub fn get(&self, recipient: &Address) -> Option<U256> {
        self.balances.get(recipient).copied()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Entries in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    /// Amounts in ascending address order.
    pub fn amounts(&self) -> impl Iterator<Item = U256> + '_ {
        self.balances.values().copied()
    }
}

/// Builds a map from final balances; a repeated address keeps its last amount.
impl FromIterator<(Address, U256)> for BalanceMap {
    fn from_iter<I: IntoIterator<Item = (Address, U256)>>(iter: I) -> Self {
        Self {
            balances: iter.into_iter().collect(),
        }
    }
}
