// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clause assembly.
//!
//! [`ClauseBuilder`] turns high-level intents into raw clauses. Each entry
//! keeps its raw string form so [`ClauseBuilder::validate`] can report every
//! problem at once instead of stopping at the first one.

use std::fmt;

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::abi;
use super::client::ThorError;
use super::token::{IVIP180, IVIP181};
use super::types::{parse_address, to_hex, Clause};
use super::units::{parse_amount, parse_base_units, to_wei, TOKEN_DECIMALS};

/// Base of every per-clause gas hint.
pub const CLAUSE_HINT_BASE_GAS: u64 = 20_000;

/// One problem found by [`ClauseBuilder::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseViolation {
    /// Index of the offending clause, `None` for list-level problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ClauseViolation {
    pub fn list(message: impl Into<String>) -> Self {
        Self {
            index: None,
            field: "clauses".to_string(),
            message: message.into(),
        }
    }

    pub fn at(index: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ClauseViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "clause[{index}].{}: {}", self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Clause as supplied by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClause {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "zero_value")]
    pub value: String,
    #[serde(default = "empty_data")]
    pub data: String,
}

fn zero_value() -> String {
    "0".to_string()
}

fn empty_data() -> String {
    "0x".to_string()
}

/// What a clause is for; drives the annotation and gas hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Transfer,
    TokenTransfer,
    TokenApprove,
    NftTransfer,
    ContractCall,
    Deploy,
    Raw,
}

impl ClauseKind {
    /// Heuristic gas for UI hinting; never enforced on chain.
    pub fn gas_hint(self) -> u64 {
        CLAUSE_HINT_BASE_GAS
            + match self {
                ClauseKind::Transfer => 0,
                ClauseKind::TokenTransfer => 40_000,
                ClauseKind::TokenApprove => 30_000,
                ClauseKind::NftTransfer => 60_000,
                ClauseKind::ContractCall => 80_000,
                ClauseKind::Deploy => 480_000,
                ClauseKind::Raw => 30_000,
            }
    }
}

/// High-level description of one clause, as accepted from callers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClauseIntent {
    Transfer {
        to: String,
        amount: String,
        #[serde(default = "default_unit")]
        unit: String,
    },
    TokenTransfer {
        token: String,
        to: String,
        amount: String,
        #[serde(default = "default_decimals")]
        decimals: u8,
    },
    TokenApprove {
        token: String,
        spender: String,
        amount: String,
        #[serde(default = "default_decimals")]
        decimals: u8,
    },
    NftTransfer {
        contract: String,
        from: String,
        to: String,
        token_id: String,
        #[serde(default)]
        safe: bool,
    },
    ContractCall {
        contract: String,
        abi: Value,
        method: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default = "zero_value")]
        value: String,
    },
    Deploy {
        bytecode: String,
        #[serde(default)]
        abi: Option<Value>,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default = "zero_value")]
        value: String,
    },
    Raw(RawClause),
}

fn default_unit() -> String {
    "vet".to_string()
}

fn default_decimals() -> u8 {
    TOKEN_DECIMALS
}

/// Assembled clause plus its UI metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseEntry {
    pub clause: RawClause,
    pub kind: ClauseKind,
    pub annotation: String,
    pub gas_hint: u64,
}

/// Ordered, append-only clause list.
#[derive(Debug, Clone, Default)]
pub struct ClauseBuilder {
    entries: Vec<ClauseEntry>,
}

impl ClauseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ClauseEntry] {
        &self.entries
    }

    /// Sum of the per-clause gas hints.
    pub fn gas_hint(&self) -> u64 {
        self.entries.iter().map(|e| e.gas_hint).sum()
    }

    fn push(&mut self, clause: RawClause, kind: ClauseKind, annotation: String) -> &mut Self {
        self.entries.push(ClauseEntry {
            clause,
            kind,
            annotation,
            gas_hint: kind.gas_hint(),
        });
        self
    }

    fn push_call(
        &mut self,
        to: Address,
        value: U256,
        data: Vec<u8>,
        kind: ClauseKind,
        annotation: String,
    ) -> &mut Self {
        let clause = RawClause {
            to: Some(to_hex(to)),
            value: value.to_string(),
            data: to_hex(data),
        };
        self.push(clause, kind, annotation)
    }

    /// Plain value transfer of `amount` expressed in `unit`.
    pub fn transfer(&mut self, to: &str, amount: &str, unit: &str) -> Result<&mut Self, ThorError> {
        let recipient = parse_address(to)?;
        let value = to_wei(amount, unit)?;
        let annotation = format!(
            "Transfer {amount} {} to {}",
            unit.to_ascii_uppercase(),
            to_hex(recipient)
        );
        Ok(self.push_call(recipient, value, Vec::new(), ClauseKind::Transfer, annotation))
    }

    /// VIP-180 `transfer(to, amount)`.
    pub fn token_transfer(
        &mut self,
        token: &str,
        to: &str,
        amount: &str,
        decimals: u8,
    ) -> Result<&mut Self, ThorError> {
        let token = parse_address(token)?;
        let recipient = parse_address(to)?;
        let amount_raw = parse_amount(amount, decimals)?;
        let data = IVIP180::transferCall {
            to: recipient,
            amount: amount_raw,
        }
        .abi_encode();
        let annotation = format!(
            "Transfer {amount} of token {} to {}",
            to_hex(token),
            to_hex(recipient)
        );
        Ok(self.push_call(token, U256::ZERO, data, ClauseKind::TokenTransfer, annotation))
    }

    /// VIP-180 `approve(spender, amount)`.
    pub fn token_approve(
        &mut self,
        token: &str,
        spender: &str,
        amount: &str,
        decimals: u8,
    ) -> Result<&mut Self, ThorError> {
        let token = parse_address(token)?;
        let spender = parse_address(spender)?;
        let amount_raw = parse_amount(amount, decimals)?;
        let data = IVIP180::approveCall {
            spender,
            amount: amount_raw,
        }
        .abi_encode();
        let annotation = format!(
            "Approve {} to spend {amount} of token {}",
            to_hex(spender),
            to_hex(token)
        );
        Ok(self.push_call(token, U256::ZERO, data, ClauseKind::TokenApprove, annotation))
    }

    /// VIP-181 `transferFrom` or `safeTransferFrom`.
    pub fn nft_transfer(
        &mut self,
        contract: &str,
        from: &str,
        to: &str,
        token_id: &str,
        safe: bool,
    ) -> Result<&mut Self, ThorError> {
        let contract = parse_address(contract)?;
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        let token_id = parse_base_units(token_id).ok_or_else(|| ThorError::InvalidParameter {
            name: "tokenId".to_string(),
            value: token_id.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })?;
        let data = if safe {
            IVIP181::safeTransferFromCall {
                from,
                to,
                tokenId: token_id,
            }
            .abi_encode()
        } else {
            IVIP181::transferFromCall {
                from,
                to,
                tokenId: token_id,
            }
            .abi_encode()
        };
        let annotation =
            format!("Transfer NFT #{token_id} of {} to {}", to_hex(contract), to_hex(to));
        Ok(self.push_call(contract, U256::ZERO, data, ClauseKind::NftTransfer, annotation))
    }

    /// Call `method` from a user-supplied ABI. `value` is in wei.
    pub fn contract_call(
        &mut self,
        contract: &str,
        abi_json: &Value,
        method: &str,
        args: &[Value],
        value: &str,
    ) -> Result<&mut Self, ThorError> {
        let contract = parse_address(contract)?;
        let value = parse_wei_value(value)?;
        let data = abi::encode_call_by_name(abi_json, method, args)?;
        let annotation = format!("Call {method} on {}", to_hex(contract));
        Ok(self.push_call(contract, value, data.to_vec(), ClauseKind::ContractCall, annotation))
    }

    /// Contract creation clause (`to` is null).
    pub fn deploy(
        &mut self,
        bytecode: &str,
        abi_json: Option<&Value>,
        args: &[Value],
        value: &str,
    ) -> Result<&mut Self, ThorError> {
        let code = parse_hex_data(bytecode).ok_or_else(|| {
            ThorError::Encoding(format!("bytecode `{bytecode}` is not 0x-prefixed hex"))
        })?;
        let value = parse_wei_value(value)?;
        let data = abi::encode_deploy(&code, abi_json, args)?;
        let clause = RawClause {
            to: None,
            value: value.to_string(),
            data: to_hex(&data),
        };
        let annotation = format!("Deploy contract ({} bytes)", data.len());
        Ok(self.push(clause, ClauseKind::Deploy, annotation))
    }

    /// Append a clause verbatim; problems surface in [`validate`](Self::validate).
    pub fn raw(&mut self, clause: RawClause) -> &mut Self {
        let annotation = match &clause.to {
            Some(to) => format!("Raw clause to {to}"),
            None => "Raw contract creation".to_string(),
        };
        self.push(clause, ClauseKind::Raw, annotation)
    }

    pub fn add_intent(&mut self, intent: &ClauseIntent) -> Result<&mut Self, ThorError> {
        match intent {
            ClauseIntent::Transfer { to, amount, unit } => self.transfer(to, amount, unit),
            ClauseIntent::TokenTransfer {
                token,
                to,
                amount,
                decimals,
            } => self.token_transfer(token, to, amount, *decimals),
            ClauseIntent::TokenApprove {
                token,
                spender,
                amount,
                decimals,
            } => self.token_approve(token, spender, amount, *decimals),
            ClauseIntent::NftTransfer {
                contract,
                from,
                to,
                token_id,
                safe,
            } => self.nft_transfer(contract, from, to, token_id, *safe),
            ClauseIntent::ContractCall {
                contract,
                abi,
                method,
                args,
                value,
            } => self.contract_call(contract, abi, method, args, value),
            ClauseIntent::Deploy {
                bytecode,
                abi,
                args,
                value,
            } => self.deploy(bytecode, abi.as_ref(), args, value),
            ClauseIntent::Raw(clause) => Ok(self.raw(clause.clone())),
        }
    }

    /// Check every clause and return all violations found.
    pub fn validate(&self) -> Vec<ClauseViolation> {
        if self.entries.is_empty() {
            return vec![ClauseViolation::list("no clauses")];
        }

        let mut violations = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let clause = &entry.clause;
            if let Some(to) = &clause.to {
                if parse_address(to).is_err() {
                    violations.push(ClauseViolation::at(
                        index,
                        "to",
                        format!("invalid address `{to}`"),
                    ));
                }
            }
            if parse_base_units(&clause.value).is_none() {
                violations.push(ClauseViolation::at(
                    index,
                    "value",
                    format!("`{}` is not a non-negative integer", clause.value),
                ));
            }
            if parse_hex_data(&clause.data).is_none() {
                violations.push(ClauseViolation::at(
                    index,
                    "data",
                    format!("`{}` is not 0x-prefixed hex", clause.data),
                ));
            }
        }
        violations
    }

    /// Validated clauses ready for a transaction body.
    pub fn build(&self) -> Result<Vec<Clause>, ThorError> {
        let violations = self.validate();
        if !violations.is_empty() {
            return Err(ThorError::Validation(violations));
        }

        self.entries
            .iter()
            .map(|entry| -> Result<Clause, ThorError> {
                let raw = &entry.clause;
                let to = raw.to.as_deref().map(parse_address).transpose()?;
                let value = parse_base_units(&raw.value).unwrap_or_default();
                let data = parse_hex_data(&raw.data).unwrap_or_default();
                Ok(Clause::new(to, value, data))
            })
            .collect()
    }
}

/// Parse a non-negative integer amount in wei.
fn parse_wei_value(value: &str) -> Result<U256, ThorError> {
    parse_base_units(value).ok_or_else(|| ThorError::InvalidAmount {
        value: value.to_string(),
        reason: "expected a non-negative integer in wei".to_string(),
    })
}

/// Decode `0x`-prefixed hex call data; `"0x"` is empty data.
pub fn parse_hex_data(raw: &str) -> Option<Bytes> {
    let hex = raw.trim().strip_prefix("0x")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    alloy::hex::decode(hex).ok().map(Bytes::from)
}
