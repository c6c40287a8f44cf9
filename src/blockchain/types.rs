// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.
//!
//! Network constants, the transaction body data model, and the JSON shapes
//! returned by the Thor REST API.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::client::ThorError;

/// VeChainThor network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Last byte of the genesis block id, embedded in every transaction
    pub chain_tag: u8,
    /// Default public node URL
    pub node_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// VeChainThor mainnet configuration.
pub const VECHAIN_MAINNET: NetworkConfig = NetworkConfig {
    name: "VeChainThor Mainnet",
    chain_tag: 0x4a,
    node_url: "https://mainnet.vechain.org",
    explorer_url: "https://vechainstats.com",
};

/// VeChainThor testnet configuration.
pub const VECHAIN_TESTNET: NetworkConfig = NetworkConfig {
    name: "VeChainThor Testnet",
    chain_tag: 0x27,
    node_url: "https://testnet.vechain.org",
    explorer_url: "https://explore-testnet.vechain.org",
};

/// Local solo node configuration.
pub const VECHAIN_SOLO: NetworkConfig = NetworkConfig {
    name: "VeChainThor Solo",
    chain_tag: 0xf6,
    node_url: "http://localhost:8669",
    explorer_url: "http://localhost:8669",
};

/// Built-in VTHO (energy) token contract.
pub const VTHO_CONTRACT: Address = Address::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x45, 0x6e,
    0x65, 0x72, 0x67, 0x79,
]);

/// Default number of blocks a transaction stays valid past its block reference.
pub const DEFAULT_EXPIRATION: u32 = 32;

/// Bit 0 of `reserved.features`: fee delegation (VIP-191).
pub const DELEGATION_FEATURE: u32 = 1;

/// Resolve a network by its short name (`main`, `test`, `solo`).
pub fn network_by_name(raw: &str) -> Result<NetworkConfig, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "main" | "mainnet" => Ok(VECHAIN_MAINNET),
        "test" | "testnet" => Ok(VECHAIN_TESTNET),
        "solo" => Ok(VECHAIN_SOLO),
        other => Err(format!(
            "Unknown network `{other}` (expected `main`, `test` or `solo`)"
        )),
    }
}

/// Parse a strictly formatted address: `0x` followed by exactly 40 hex digits.
///
/// Comparison is case-insensitive, so no checksum is enforced.
pub fn parse_address(raw: &str) -> Result<Address, ThorError> {
    let trimmed = raw.trim();
    let valid = trimmed.len() == 42
        && (trimmed.starts_with("0x") || trimmed.starts_with("0X"))
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ThorError::InvalidAddress(raw.to_string()));
    }
    Address::from_str(&trimmed[2..]).map_err(|_| ThorError::InvalidAddress(raw.to_string()))
}

/// Lowercase `0x`-prefixed hex encoding.
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", alloy::hex::encode(bytes))
}

/// Serde helper for amounts carried as decimal strings.
///
/// Deserialization also accepts `0x`-prefixed hex strings and plain JSON
/// numbers, since the node reports amounts in hex.
pub mod decimal_u256 {
    use std::str::FromStr;

    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => U256::from_str(text.trim()).map_err(D::Error::custom),
            Raw::Number(n) => Ok(U256::from(n)),
        }
    }
}

// =============================================================================
// Transaction Body
// =============================================================================

/// One operation inside a transaction.
///
/// `to == None` deploys `data` as contract code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub to: Option<Address>,
    #[serde(with = "decimal_u256")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl Clause {
    pub fn new(to: Option<Address>, value: U256, data: Bytes) -> Self {
        Self { to, value, data }
    }

    /// Plain value transfer with empty call data.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self::new(Some(to), value, Bytes::new())
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Reserved field of the body; only `features` is defined today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserved {
    pub features: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unused: Vec<Bytes>,
}

/// Canonical VeChainThor transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBody {
    pub chain_tag: u8,
    /// First 8 bytes of a block id, as a big-endian integer
    pub block_ref: u64,
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub gas_price_coef: u8,
    pub gas: u64,
    pub depends_on: Option<B256>,
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<Reserved>,
}

impl TransactionBody {
    /// Whether the fee-delegation feature bit is set.
    pub fn is_delegated(&self) -> bool {
        self.reserved
            .as_ref()
            .map(|r| r.features & DELEGATION_FEATURE != 0)
            .unwrap_or(false)
    }

    /// Return the body with the fee-delegation feature bit set.
    pub fn with_delegation(mut self) -> Self {
        let reserved = self.reserved.get_or_insert_with(Reserved::default);
        reserved.features |= DELEGATION_FEATURE;
        self
    }

    /// Block reference rendered as 16 hex digits.
    pub fn block_ref_hex(&self) -> String {
        to_hex(self.block_ref.to_be_bytes())
    }
}

/// Derive the block reference from a block id (its first 8 bytes).
pub fn block_ref_from_id(id: &B256) -> u64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&id[..8]);
    u64::from_be_bytes(prefix)
}

/// A signed transaction that was accepted by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedTransaction {
    pub id: B256,
    pub raw: String,
}

// =============================================================================
// Revisions
// =============================================================================

/// Block selector accepted by the node API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    Best,
    Finalized,
    Number(u64),
    Id(B256),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Best => f.write_str("best"),
            Revision::Finalized => f.write_str("finalized"),
            Revision::Number(n) => write!(f, "{n}"),
            Revision::Id(id) => write!(f, "{id:#x}"),
        }
    }
}

impl FromStr for Revision {
    type Err = ThorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        match value.to_ascii_lowercase().as_str() {
            "best" => return Ok(Revision::Best),
            "finalized" => return Ok(Revision::Finalized),
            _ => {}
        }
        if let Ok(n) = value.parse::<u64>() {
            return Ok(Revision::Number(n));
        }
        B256::from_str(value)
            .map(Revision::Id)
            .map_err(|_| ThorError::InvalidParameter {
                name: "revision".to_string(),
                value: raw.to_string(),
                reason: "expected a block number, block id, `best` or `finalized`".to_string(),
            })
    }
}

// =============================================================================
// Node API Shapes
// =============================================================================

/// Account state returned by `GET /accounts/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub balance: U256,
    pub energy: U256,
    pub has_code: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CodeResponse {
    pub code: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StorageResponse {
    pub value: B256,
}

/// Block returned by `GET /blocks/{revision}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: u64,
    pub id: B256,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "parentID")]
    pub parent_id: B256,
    pub timestamp: u64,
    pub gas_limit: u64,
    #[serde(default)]
    pub beneficiary: Option<Address>,
    pub gas_used: u64,
    #[serde(default)]
    pub total_score: u64,
    #[serde(default)]
    pub signer: Option<Address>,
    #[serde(default)]
    pub is_trunk: bool,
    #[serde(default)]
    pub is_finalized: Option<bool>,
    #[serde(default)]
    pub transactions: Vec<B256>,
}

/// Block or transaction placement metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    #[serde(rename = "blockID")]
    pub block_id: B256,
    pub block_number: u64,
    pub block_timestamp: u64,
}

/// Transaction returned by `GET /transactions/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    pub id: B256,
    pub chain_tag: u8,
    pub block_ref: String,
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub gas_price_coef: u8,
    pub gas: u64,
    pub origin: Address,
    #[serde(default)]
    pub delegator: Option<Address>,
    pub nonce: String,
    #[serde(default)]
    pub depends_on: Option<B256>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub meta: Option<TxMeta>,
}

/// Event emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Value transfer performed during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
}

/// Per-clause output of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseOutput {
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
}

/// Placement metadata of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    #[serde(rename = "blockID")]
    pub block_id: B256,
    pub block_number: u64,
    pub block_timestamp: u64,
    #[serde(rename = "txID")]
    pub tx_id: B256,
    pub tx_origin: Address,
}

/// Receipt returned by `GET /transactions/{id}/receipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub gas_used: u64,
    pub gas_payer: Address,
    pub paid: U256,
    pub reward: U256,
    pub reverted: bool,
    pub meta: ReceiptMeta,
    #[serde(default)]
    pub outputs: Vec<ClauseOutput>,
}

/// Body of `POST /accounts/*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub clauses: Vec<Clause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
}

/// Simulation result for one clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub data: Bytes,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    pub gas_used: u64,
    pub reverted: bool,
    #[serde(default)]
    pub vm_error: String,
}

// =============================================================================
// Log Filters
// =============================================================================

/// Block range of a log filter; both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRange {
    pub unit: &'static str,
    pub from: u64,
    pub to: u64,
}

impl FilterRange {
    pub fn blocks(from: u64, to: u64) -> Self {
        Self {
            unit: "block",
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub offset: u64,
    pub limit: u64,
}

/// One OR-ed criteria entry of an event filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic0: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic1: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic2: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic3: Option<B256>,
}

/// One OR-ed criteria entry of a transfer filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_origin: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
}

/// Body of `POST /logs/event` and `POST /logs/transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter<C> {
    pub range: FilterRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<FilterOptions>,
    pub criteria_set: Vec<C>,
    pub order: &'static str,
}

impl<C> LogFilter<C> {
    /// Ascending filter over a block range.
    pub fn range(from: u64, to: u64, criteria_set: Vec<C>) -> Self {
        Self {
            range: FilterRange::blocks(from, to),
            options: None,
            criteria_set,
            order: "asc",
        }
    }
}

pub type EventFilter = LogFilter<EventCriteria>;
pub type TransferFilter = LogFilter<TransferCriteria>;

/// Provenance attached to every log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMeta {
    #[serde(rename = "blockID")]
    pub block_id: B256,
    pub block_number: u64,
    pub block_timestamp: u64,
    #[serde(rename = "txID")]
    pub tx_id: B256,
    pub tx_origin: Address,
    #[serde(default)]
    pub clause_index: u32,
}

/// Entry returned by `POST /logs/event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub meta: LogMeta,
}

/// Entry returned by `POST /logs/transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLog {
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
    pub meta: LogMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendTransactionResponse {
    pub id: B256,
}
