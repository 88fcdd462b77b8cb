//! Transaction and RPC types
//!
//! `TransactionRecord` is the unit the replay engine consumes. It is
//! deserialized from the archive API's `txlist` rows (decimal strings for
//! numbers, hex strings for bytes) or assembled from a node block plus
//! receipt in block-scan mode.

use crate::abi::selector_hex;
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One historical transaction touching a watched address.
///
/// Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionRecord {
    /// Block the transaction was included in (decimal string in archive JSON)
    #[serde(rename = "blockNumber", deserialize_with = "deserialize_dec_u64")]
    pub block_number: u64,

    /// Block timestamp, Unix seconds
    #[serde(rename = "timeStamp", default, deserialize_with = "deserialize_dec_u64_opt")]
    pub timestamp: Option<u64>,

    /// Transaction hash
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Position inside the block
    #[serde(rename = "transactionIndex", default, deserialize_with = "deserialize_dec_u64_opt")]
    pub transaction_index: Option<u64>,

    /// Sender
    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    /// Recipient (None for contract creation, "" in archive JSON)
    #[serde(rename = "to", default, deserialize_with = "deserialize_hex_address_opt")]
    pub to: Option<Address>,

    /// Raw call data
    #[serde(rename = "input", deserialize_with = "deserialize_hex_bytes")]
    pub input: Vec<u8>,

    /// Value transferred in wei (decimal string in archive JSON)
    #[serde(rename = "value", deserialize_with = "deserialize_dec_u256")]
    pub value: U256,

    /// True when the transaction reverted ("0" in archive JSON means success)
    #[serde(rename = "isError", deserialize_with = "deserialize_error_flag")]
    pub is_error: bool,

    /// 4-byte selector hint from the archive, e.g. "0x2b2d3c66"
    #[serde(rename = "methodId", default, deserialize_with = "deserialize_non_empty")]
    pub method_id: Option<String>,

    /// Human readable signature hint from the archive
    #[serde(rename = "functionName", default, deserialize_with = "deserialize_non_empty")]
    pub function_name: Option<String>,
}

impl TransactionRecord {
    /// Build a record from a node transaction and its receipt.
    pub fn from_rpc(block: &Block, tx: &Transaction, receipt: &Receipt) -> Self {
        Self {
            block_number: block.number,
            timestamp: Some(block.timestamp),
            hash: tx.hash,
            transaction_index: tx.transaction_index,
            from: tx.from,
            to: tx.to,
            input: tx.input.clone(),
            value: tx.value,
            is_error: !receipt.is_success(),
            method_id: (tx.input.len() >= 4).then(|| selector_hex(&tx.input)),
            function_name: None,
        }
    }

    /// Check if this transaction succeeded and was sent to `target`.
    pub fn is_successful_call_to(&self, target: Address) -> bool {
        !self.is_error && self.to == Some(target)
    }
}

/// Envelope returned by every archive API call.
///
/// `result` is a list of rows on success and a plain string on errors, so it
/// is kept raw until the status has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    /// "1" on success, "0" otherwise
    pub status: String,
    /// "OK", "NOTOK", "No transactions found", ...
    pub message: String,
    /// Rows or an error string
    #[serde(default)]
    pub result: Value,
}

impl ArchiveResponse {
    /// Check if the archive reported success.
    pub fn is_success(&self) -> bool {
        self.status == "1"
    }

    /// Error detail carried in `result` when the call failed.
    pub fn error_detail(&self) -> Option<&str> {
        self.result.as_str()
    }

    /// Decode the rows of a successful response.
    pub fn into_records(self) -> Result<Vec<TransactionRecord>> {
        if self.result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(self.result).context("Failed to decode archive transaction rows")
    }
}

/// Block with full transaction objects, as returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    /// Block number (hex string in JSON, parsed to u64)
    #[serde(rename = "number", deserialize_with = "deserialize_hex_u64")]
    pub number: u64,

    /// Block hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Block timestamp (hex string in JSON)
    #[serde(rename = "timestamp", deserialize_with = "deserialize_hex_u64")]
    pub timestamp: u64,

    /// List of transactions in the block
    #[serde(rename = "transactions", default)]
    pub transactions: Vec<Transaction>,
}

/// Node transaction object.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Transaction hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Position in the block (hex string in JSON)
    #[serde(rename = "transactionIndex", default, deserialize_with = "deserialize_hex_u64_opt")]
    pub transaction_index: Option<u64>,

    /// Sender address (hex string in JSON)
    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    /// Recipient address (None for contract creation, hex string in JSON)
    #[serde(rename = "to", default, deserialize_with = "deserialize_hex_address_opt")]
    pub to: Option<Address>,

    /// Value transferred in wei (hex string in JSON)
    #[serde(rename = "value", deserialize_with = "deserialize_hex_u256")]
    pub value: U256,

    /// Transaction input data (hex string in JSON, "0x" for simple transfers)
    #[serde(rename = "input", deserialize_with = "deserialize_hex_bytes")]
    pub input: Vec<u8>,
}

/// Transaction receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    /// Transaction status: 1 = success, 0 = failure (hex string in JSON)
    #[serde(rename = "status", deserialize_with = "deserialize_hex_u64")]
    pub status: u64,
}

impl Receipt {
    /// Check if the transaction succeeded.
    pub fn is_success(&self) -> bool {
        self.status == 1
    }
}

// Hex and decimal deserialization helpers

/// Pad an odd-length hex string with a leading zero.
/// This handles cases where RPC returns hex strings without leading zeros.
pub(crate) fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Deserialize a hex string to u64.
fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

/// Deserialize an optional hex string to u64.
fn deserialize_hex_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            if s.is_empty() {
                return Ok(None);
            }
            u64::from_str_radix(s, 16).map(Some).map_err(serde::de::Error::custom)
        }
        None => Ok(None),
    }
}

/// Deserialize a decimal string to u64.
fn deserialize_dec_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim().parse::<u64>().map_err(serde::de::Error::custom)
}

/// Deserialize an optional decimal string to u64, treating "" as missing.
fn deserialize_dec_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        Some("") | None => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a decimal string to U256.
fn deserialize_dec_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(s, 10).map_err(serde::de::Error::custom)
}

/// Deserialize a hex string to U256.
fn deserialize_hex_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    Ok(U256::from_be_slice(&bytes))
}

/// Deserialize the archive's error flag: "0" is success, anything else is a failure.
fn deserialize_error_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim() != "0")
}

/// Deserialize an optional string, mapping "" to None.
fn deserialize_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()))
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize a hex string to Address.
fn deserialize_hex_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 20 {
        return Err(serde::de::Error::custom(format!(
            "Expected 20 bytes for address, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Deserialize an optional hex string to Address, treating "" as None.
fn deserialize_hex_address_opt<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            if s.is_empty() {
                Ok(None)
            } else {
                let s = pad_hex_string(s);
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                if bytes.len() != 20 {
                    return Err(serde::de::Error::custom(format!(
                        "Expected 20 bytes for address, got {}",
                        bytes.len()
                    )));
                }
                Ok(Some(Address::from_slice(&bytes)))
            }
        }
        None => Ok(None),
    }
}

/// Deserialize a hex string to bytes.
fn deserialize_hex_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    if s.is_empty() {
        Ok(Vec::new())
    } else {
        let s = pad_hex_string(s);
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    fn archive_row() -> Value {
        json!({
            "blockNumber": "17290011",
            "timeStamp": "1684425011",
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "nonce": "12",
            "blockHash": "0x0b1a1b3a17c4ad1a0f2b5e4b8cb0f5a3ff2a5fe01c4c9c8c0bd4dba7a1fc0e61",
            "transactionIndex": "7",
            "from": "0x91364516d3cad16e1666261dbdbb39c881dbe9ee",
            "to": "0x3007083eaa95497cd6b2b809fb97b6a30bdf53d3",
            "value": "1000000000000000000",
            "gas": "60000",
            "gasPrice": "40000000000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0xdeadbeef",
            "contractAddress": "",
            "cumulativeGasUsed": "1200000",
            "gasUsed": "45000",
            "confirmations": "1000",
            "methodId": "0xdeadbeef",
            "functionName": ""
        })
    }

    #[test]
    fn test_archive_row_parses() {
        let record: TransactionRecord = serde_json::from_value(archive_row()).unwrap();
        assert_eq!(record.block_number, 17290011);
        assert_eq!(record.timestamp, Some(1684425011));
        assert_eq!(record.transaction_index, Some(7));
        assert_eq!(record.from, address!("91364516D3CAD16E1666261dbdbb39c881Dbe9eE"));
        assert_eq!(record.to, Some(address!("3007083EAA95497cD6B2b809fB97B6A30bdF53D3")));
        assert_eq!(record.input, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(record.value, U256::from(1_000_000_000_000_000_000u64));
        assert!(!record.is_error);
        assert_eq!(record.method_id.as_deref(), Some("0xdeadbeef"));
        assert_eq!(record.function_name, None);
    }

    #[test]
    fn test_archive_row_contract_creation_and_failure() {
        let mut row = archive_row();
        row["to"] = json!("");
        row["isError"] = json!("1");
        let record: TransactionRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.to, None);
        assert!(record.is_error);
    }

    #[test]
    fn test_successful_call_filter_ignores_case() {
        let record: TransactionRecord = serde_json::from_value(archive_row()).unwrap();
        // Checksummed and lowercase spellings parse to the same address.
        assert!(record.is_successful_call_to(address!("3007083EAA95497cD6B2b809fB97B6A30bdF53D3")));
        assert!(!record.is_successful_call_to(address!("2c952eE289BbDB3aEbA329a4c41AE4C836bcc231")));
    }

    #[test]
    fn test_archive_error_envelope() {
        let response: ArchiveResponse = serde_json::from_value(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        }))
        .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.error_detail(), Some("Max rate limit reached"));
    }

    #[test]
    fn test_archive_success_envelope() {
        let response: ArchiveResponse = serde_json::from_value(json!({
            "status": "1",
            "message": "OK",
            "result": [archive_row(), archive_row()]
        }))
        .unwrap();
        assert!(response.is_success());
        assert_eq!(response.into_records().unwrap().len(), 2);
    }

    #[test]
    fn test_record_from_rpc() {
        let block: Block = serde_json::from_value(json!({
            "number": "0x107d7b3",
            "hash": "0x0b1a1b3a17c4ad1a0f2b5e4b8cb0f5a3ff2a5fe01c4c9c8c0bd4dba7a1fc0e61",
            "timestamp": "0x64665e33",
            "transactions": [{
                "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
                "transactionIndex": "0x3",
                "from": "0x91364516d3cad16e1666261dbdbb39c881dbe9ee",
                "to": "0x3007083eaa95497cd6b2b809fb97b6a30bdf53d3",
                "value": "0x0",
                "input": "0xa9059cbb00"
            }]
        }))
        .unwrap();
        let receipt: Receipt = serde_json::from_value(json!({ "status": "0x0" })).unwrap();

        let record = TransactionRecord::from_rpc(&block, &block.transactions[0], &receipt);
        assert_eq!(record.block_number, 0x107d7b3);
        assert_eq!(record.transaction_index, Some(3));
        assert!(record.is_error);
        assert_eq!(record.method_id.as_deref(), Some("0xa9059cbb"));
    }
}
