//! Configuration defaults and address-list loading
//!
//! Holds the mainnet deployment constants for the two replayed contracts and
//! loads address lists from files (one address per line).

use alloy_primitives::{address, Address};
use crate::types::pad_hex_string;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Allow-list token contract.
pub const PSYOP_ADDRESS: Address = address!("3007083EAA95497cD6B2b809fB97B6A30bdF53D3");

/// Airdrop distribution contract.
pub const AIRDROP_ADDRESS: Address = address!("2c952eE289BbDB3aEbA329a4c41AE4C836bcc231");

/// First block worth scanning (token deployment).
pub const DEPLOYMENT_BLOCK: u64 = 17_289_896;

/// Addresses allow-listed by the token constructor. They never show up as
/// `setAddressToWhiteList` calls, so replay starts from them.
pub const CONSTRUCTOR_ALLOWED: [Address; 2] = [
    address!("91364516D3CAD16E1666261dbdbb39c881Dbe9eE"),
    address!("FA080F371f2B9986dFD0A692DA4da343178233D0"),
];

/// Default archive API endpoint.
pub const DEFAULT_ARCHIVE_URL: &str = "https://api.etherscan.io/api";

/// Default node RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Default number of receipt requests in flight in block-scan mode.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Load an address list from a file.
///
/// Each line should contain one Ethereum address in hex format (with or without 0x prefix).
/// Empty lines and lines starting with '#' are ignored.
///
/// # Example file format:
/// ```text
/// 0x91364516D3CAD16E1666261dbdbb39c881Dbe9eE
/// # granted by the constructor
/// 0xFA080F371f2B9986dFD0A692DA4da343178233D0
/// ```
pub fn load_address_list(path: &Path) -> Result<Vec<Address>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read address list file: {:?}", path))?;

    let mut addresses = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let addr = parse_address(line)
            .with_context(|| format!("Invalid address on line {}: {}", line_num + 1, line))?;

        addresses.push(addr);
    }

    Ok(addresses)
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix, in any letter case.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }

    Ok(Address::from_slice(&bytes))
}
