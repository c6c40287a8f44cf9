// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records emitted by a poll tick.
//!
//! Every record carries its block/transaction provenance. Amounts are kept
//! twice: the exact base-unit integer and a formatted decimal string.

use alloy::primitives::U256;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::blockchain::token::TokenMetadata;
use crate::blockchain::types::{to_hex, Block, EventLog, LogMeta, TransferLog};
use crate::blockchain::units::{format_amount, TOKEN_DECIMALS};

/// One derived trigger event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DerivedEvent {
    NewBlock(BlockInfo),
    BlockFinalized(BlockInfo),
    VetTransfer(TransferEvent),
    LargeTransaction(TransferEvent),
    TokenTransfer(TokenTransferEvent),
    NftTransfer(NftTransferEvent),
    ContractEvent(ContractEventRecord),
}

impl DerivedEvent {
    pub fn block_number(&self) -> u64 {
        match self {
            DerivedEvent::NewBlock(b) | DerivedEvent::BlockFinalized(b) => b.block_number,
            DerivedEvent::VetTransfer(t) | DerivedEvent::LargeTransaction(t) => t.block_number,
            DerivedEvent::TokenTransfer(t) => t.block_number,
            DerivedEvent::NftTransfer(t) => t.block_number,
            DerivedEvent::ContractEvent(e) => e.block_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub block_number: u64,
    pub block_id: String,
    pub parent_id: String,
    pub timestamp: String,
    pub gas_used: u64,
    pub gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    pub transaction_count: usize,
    pub transactions: Vec<String>,
    /// Blocks between this one and best at the time of the tick
    pub confirmations: u64,
}

impl BlockInfo {
    pub fn new(block: &Block, best_number: u64) -> Self {
        Self {
            block_number: block.number,
            block_id: to_hex(block.id),
            parent_id: to_hex(block.parent_id),
            timestamp: rfc3339(block.timestamp),
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
            signer: block.signer.map(to_hex),
            transaction_count: block.transactions.len(),
            transactions: block.transactions.iter().map(to_hex).collect(),
            confirmations: best_number.saturating_sub(block.number),
        }
    }
}

/// Native VET movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub tx_id: String,
    pub tx_origin: String,
    pub block_number: u64,
    pub block_id: String,
    pub timestamp: String,
    pub clause_index: u32,
    pub from: String,
    pub to: String,
    /// Base units (wei)
    pub amount: String,
    pub amount_vet: String,
    /// `incoming`, `outgoing` or `self` relative to the watched address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
}

impl TransferEvent {
    pub fn new(log: &TransferLog, direction: Option<&'static str>) -> Self {
        Self {
            tx_id: to_hex(log.meta.tx_id),
            tx_origin: to_hex(log.meta.tx_origin),
            block_number: log.meta.block_number,
            block_id: to_hex(log.meta.block_id),
            timestamp: rfc3339(log.meta.block_timestamp),
            clause_index: log.meta.clause_index,
            from: to_hex(log.sender),
            to: to_hex(log.recipient),
            amount: log.amount.to_string(),
            amount_vet: format_amount(log.amount, TOKEN_DECIMALS),
            direction,
        }
    }
}

/// Fungible token `Transfer(from, to, value)` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransferEvent {
    pub tx_id: String,
    pub block_number: u64,
    pub timestamp: String,
    pub clause_index: u32,
    pub token: TokenMetadata,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub amount_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
}

impl TokenTransferEvent {
    pub fn new(
        meta: &LogMeta,
        token: TokenMetadata,
        from: String,
        to: String,
        amount: U256,
        direction: Option<&'static str>,
    ) -> Self {
        Self {
            tx_id: to_hex(meta.tx_id),
            block_number: meta.block_number,
            timestamp: rfc3339(meta.block_timestamp),
            clause_index: meta.clause_index,
            amount_formatted: format_amount(amount, token.decimals),
            amount: amount.to_string(),
            token,
            from,
            to,
            direction,
        }
    }
}

/// Non-fungible `Transfer(from, to, tokenId)` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransferEvent {
    pub tx_id: String,
    pub block_number: u64,
    pub timestamp: String,
    pub clause_index: u32,
    pub contract: String,
    pub from: String,
    pub to: String,
    pub token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
}

/// Any log matching the configured contract and/or event signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEventRecord {
    pub tx_id: String,
    pub tx_origin: String,
    pub block_number: u64,
    pub timestamp: String,
    pub clause_index: u32,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub topics: Vec<String>,
    pub data: String,
    /// Named fields when the event signature is known and the log decodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Map<String, Value>>,
}

impl ContractEventRecord {
    pub fn new(log: &EventLog, event: Option<String>, decoded: Option<Map<String, Value>>) -> Self {
        Self {
            tx_id: to_hex(log.meta.tx_id),
            tx_origin: to_hex(log.meta.tx_origin),
            block_number: log.meta.block_number,
            timestamp: rfc3339(log.meta.block_timestamp),
            clause_index: log.meta.clause_index,
            address: to_hex(log.address),
            event,
            topics: log.topics.iter().map(to_hex).collect(),
            data: to_hex(&log.data),
            decoded,
        }
    }
}

/// Unix seconds as an RFC 3339 UTC timestamp.
pub fn rfc3339(unix_secs: u64) -> String {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| unix_secs.to_string())
}
