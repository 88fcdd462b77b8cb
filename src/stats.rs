//! Summary statistics over a completed balance map

use crate::state::BalanceMap;
use alloy_primitives::U256;
use anyhow::Result;

/// How amounts are ordered before the median is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MedianOrder {
    /// Compare the decimal renderings as strings, so "100" sorts before "9".
    #[default]
    Lexicographic,
    /// Compare the amounts as integers.
    Numeric,
}

/// Read-only snapshot of a balance map's distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub count: usize,
    pub total: U256,
    pub min: U256,
    pub max: U256,
    /// `total / count`, truncated
    pub avg: U256,
    /// Element at index `count / 2` of the amounts sorted by a [`MedianOrder`]
    pub median: U256,
}

impl Stats {
    /// Compute statistics with the default [`MedianOrder`].
    ///
    /// Fails on an empty map; callers should check `is_empty` first.
    pub fn from_balances(balances: &BalanceMap) -> Result<Self> {
        Self::from_balances_with(balances, MedianOrder::default())
    }

    /// Compute statistics over every amount in `balances`.
    ///
    /// `min` and `max` are numeric whatever `order` says. Fails on an empty
    /// map or when the total does not fit in 256 bits.
    pub fn from_balances_with(balances: &BalanceMap, order: MedianOrder) -> Result<Self> {
        if balances.is_empty() {
            anyhow::bail!("Cannot compute statistics over an empty balance map");
        }

        let mut amounts: Vec<U256> = balances.amounts().collect();
        match order {
            MedianOrder::Lexicographic => amounts.sort_by_cached_key(|amount| amount.to_string()),
            MedianOrder::Numeric => amounts.sort_unstable(),
        }

        let count = amounts.len();
        let mut total = U256::ZERO;
        let mut min = U256::MAX;
        let mut max = U256::ZERO;
        for amount in &amounts {
            total = total
                .checked_add(*amount)
                .ok_or_else(|| anyhow::anyhow!("Airdrop total overflows 256 bits"))?;
            min = min.min(*amount);
            max = max.max(*amount);
        }

        Ok(Self {
            count,
            total,
            min,
            max,
            avg: total / U256::from(count),
            median: amounts[count / 2],
        })
    }
}
