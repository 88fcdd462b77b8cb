//! Rendering of replay results
//!
//! Amounts are printed as decimal integers in every format. Addresses use
//! their checksummed form.

use crate::state::{AllowListState, BalanceMap};
use crate::stats::Stats;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

/// Output format for results written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable listing
    #[default]
    Text,
    /// One row per address with a header line
    Csv,
    /// Pretty-printed JSON document
    Json,
}

/// Write the allow-list in ascending address order.
pub fn write_allow_list<W: Write>(mut out: W, state: &AllowListState, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Allowed addresses:")?;
            for address in state.iter() {
                writeln!(out, "{}", address)?;
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["address"])?;
            for address in state.iter() {
                writer.write_record([address.to_string()])?;
            }
            writer.flush().context("Failed to flush CSV output")?;
        }
        OutputFormat::Json => {
            let addresses: Vec<String> = state.iter().map(|a| a.to_string()).collect();
            let doc = json!({
                "count": addresses.len(),
                "addresses": addresses,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
    }
    Ok(())
}

/// Write airdrop balances in ascending address order, followed by `stats`
/// when there are any.
///
/// CSV carries only the per-recipient rows.
pub fn write_airdrop<W: Write>(
    mut out: W,
    balances: &BalanceMap,
    stats: Option<&Stats>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Airdrop recipients:")?;
            for (recipient, amount) in balances.iter() {
                writeln!(out, "{} {}", recipient, amount)?;
            }
            if let Some(stats) = stats {
                writeln!(out)?;
                writeln!(out, "count:  {}", stats.count)?;
                writeln!(out, "total:  {}", stats.total)?;
                writeln!(out, "min:    {}", stats.min)?;
                writeln!(out, "max:    {}", stats.max)?;
                writeln!(out, "avg:    {}", stats.avg)?;
                writeln!(out, "median: {}", stats.median)?;
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["address", "amount"])?;
            for (recipient, amount) in balances.iter() {
                writer.write_record([recipient.to_string(), amount.to_string()])?;
            }
            writer.flush().context("Failed to flush CSV output")?;
        }
        OutputFormat::Json => {
            let recipients: Vec<_> = balances
                .iter()
                .map(|(recipient, amount)| {
                    json!({
                        "address": recipient.to_string(),
                        "amount": amount.to_string(),
                    })
                })
                .collect();
            let stats = stats.map(|s| {
                json!({
                    "count": s.count,
                    "total": s.total.to_string(),
                    "min": s.min.to_string(),
                    "max": s.max.to_string(),
                    "avg": s.avg.to_string(),
                    "median": s.median.to_string(),
                })
            });
            let doc = json!({
                "recipients": recipients,
                "stats": stats,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
    }
    Ok(())
}
