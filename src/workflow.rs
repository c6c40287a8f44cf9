// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Workflow Operations
//!
//! Per-item execution of workflow steps. Each invocation carries a batch of
//! JSON parameter objects; every operation reads its inputs through
//! [`ExecutionContext::get_parameter`] and produces one JSON result per item.
//!
//! With `continue_on_fail`, a failing item yields an `{"error": ...}` entry
//! and its siblings still run. Otherwise the first failure aborts the batch.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::blockchain::clauses::ClauseViolation;
use crate::blockchain::transactions::RECEIPT_POLL_INTERVAL;
use crate::blockchain::token::TokenContract;
use crate::blockchain::types::{parse_address, to_hex, NetworkConfig};
use crate::blockchain::{
    convert, ChainApi, Clause, ClauseBuilder, ClauseIntent, Delegator, RawClause, SigningKey,
    ThorError, TxBuilder, TxOptions,
};

/// Upper bound on how long a send waits for its receipt.
pub const MAX_RECEIPT_WAIT: Duration = Duration::from_secs(120);

/// Long-lived credentials shared by every invocation.
#[derive(Clone)]
pub struct Credentials {
    pub chain: Arc<dyn ChainApi>,
    pub network: NetworkConfig,
    pub sender: Option<Arc<SigningKey>>,
    pub delegator: Option<Arc<dyn Delegator>>,
}

/// Operation selector of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ConvertUnits,
    ValidateClauses,
    EstimateGas,
    SendTransaction,
    GetTransaction,
    GetReceipt,
    GetTokenBalance,
}

/// Capabilities plus the parameters of every item in the batch.
pub struct ExecutionContext {
    credentials: Credentials,
    builder: TxBuilder,
    items: Vec<Map<String, Value>>,
}

impl ExecutionContext {
    /// Items must be JSON objects.
    pub fn new(credentials: Credentials, items: Vec<Value>) -> Result<Self, ThorError> {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(ThorError::InvalidParameter {
                    name: format!("items[{index}]"),
                    value: other.to_string(),
                    reason: "expected a JSON object".to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let builder = TxBuilder::new(credentials.chain.clone(), credentials.network);
        Ok(Self {
            credentials,
            builder,
            items,
        })
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn chain(&self) -> &dyn ChainApi {
        self.credentials.chain.as_ref()
    }

    /// Named parameter of item `index`. Absent and `null` are both missing.
    pub fn get_parameter(&self, name: &str, index: usize) -> Result<&Value, ThorError> {
        self.get_optional(name, index)
            .ok_or_else(|| ThorError::MissingParameter {
                name: name.to_string(),
                item: index,
            })
    }

    pub fn get_optional(&self, name: &str, index: usize) -> Option<&Value> {
        self.items
            .get(index)
            .and_then(|item| item.get(name))
            .filter(|value| !value.is_null())
    }

    /// String parameter; numbers are accepted and rendered in decimal.
    pub fn get_string(&self, name: &str, index: usize) -> Result<String, ThorError> {
        match self.get_parameter(name, index)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(invalid(name, other, "expected a string")),
        }
    }

    fn get_as<T: DeserializeOwned>(
        &self,
        name: &str,
        index: usize,
    ) -> Result<Option<T>, ThorError> {
        self.get_optional(name, index)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| invalid(name, value, &e.to_string()))
            })
            .transpose()
    }

    /// Run `operation` over every item.
    pub async fn execute(
        &self,
        operation: Operation,
        continue_on_fail: bool,
    ) -> Result<Vec<Value>, ThorError> {
        let mut results = Vec::with_capacity(self.items.len());
        for index in 0..self.items.len() {
            match self.execute_item(operation, index).await {
                Ok(result) => results.push(result),
                Err(e) if continue_on_fail => {
                    tracing::warn!(item = index, ?operation, error = %e, "Workflow item failed");
                    results.push(json!({ "error": e.to_string(), "item": index }));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    async fn execute_item(&self, operation: Operation, index: usize) -> Result<Value, ThorError> {
        match operation {
            Operation::ConvertUnits => self.convert_units(index),
            Operation::ValidateClauses => self.validate_clauses(index),
            Operation::EstimateGas => self.estimate_gas(index).await,
            Operation::SendTransaction => self.send_transaction(index).await,
            Operation::GetTransaction => self.get_transaction(index).await,
            Operation::GetReceipt => self.get_receipt(index).await,
            Operation::GetTokenBalance => self.get_token_balance(index).await,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn convert_units(&self, index: usize) -> Result<Value, ThorError> {
        let value = self.get_string("value", index)?;
        let from_unit = self.get_string("fromUnit", index)?;
        let to_unit = self.get_string("toUnit", index)?;
        let result = convert(&value, &from_unit, &to_unit)?;
        Ok(json!({
            "value": value,
            "fromUnit": from_unit,
            "toUnit": to_unit,
            "result": result,
        }))
    }

    fn validate_clauses(&self, index: usize) -> Result<Value, ThorError> {
        let (builder, violations) = self.assemble(index)?;
        Ok(json!({
            "valid": violations.is_empty(),
            "violations": violations,
            "clauses": builder.entries(),
            "gasHint": builder.gas_hint(),
        }))
    }

    async fn estimate_gas(&self, index: usize) -> Result<Value, ThorError> {
        let clauses = self.clauses(index)?;
        let caller = self.credentials.sender.as_ref().map(|key| key.address());
        let gas = self.builder.estimate_gas(&clauses, caller).await?;
        Ok(json!({
            "gas": gas,
            "gasWithMargin": crate::blockchain::transactions::with_margin(gas),
        }))
    }

    async fn send_transaction(&self, index: usize) -> Result<Value, ThorError> {
        let sender = self
            .credentials
            .sender
            .as_deref()
            .ok_or_else(|| ThorError::Signing("no sender key configured".to_string()))?;
        let clauses = self.clauses(index)?;
        let options: TxOptions = self.get_as("options", index)?.unwrap_or_default();
        let wait_secs = self.get_as::<u64>("waitForReceiptSecs", index)?;
        let delegator = if options.delegate {
            self.credentials.delegator.as_deref()
        } else {
            None
        };

        let submitted = self.builder.send(clauses, &options, sender, delegator).await?;

        let mut result = json!({
            "id": to_hex(submitted.id),
            "raw": submitted.raw,
            "origin": to_hex(sender.address()),
            "delegated": options.delegate,
            "network": self.credentials.network.name,
        });

        // Once submitted, the id is the outcome; a failed receipt poll must not hide it.
        if let Some(secs) = wait_secs {
            let timeout = Duration::from_secs(secs).min(MAX_RECEIPT_WAIT);
            match self
                .builder
                .wait_for_receipt(submitted.id, timeout, RECEIPT_POLL_INTERVAL)
                .await
            {
                Ok(receipt) => {
                    result["receipt"] = receipt.map(|r| json!(r)).unwrap_or(Value::Null);
                }
                Err(e) => {
                    tracing::warn!(
                        tx_id = %submitted.id,
                        error = %e,
                        "Receipt poll failed after submission"
                    );
                    result["receipt"] = Value::Null;
                    result["receiptError"] = json!(e.to_string());
                }
            }
        }
        Ok(result)
    }

    async fn get_transaction(&self, index: usize) -> Result<Value, ThorError> {
        let id = self.tx_id(index)?;
        Ok(match self.chain().get_transaction(id).await? {
            Some(tx) => json!({ "found": true, "transaction": tx }),
            None => json!({ "found": false, "id": to_hex(id) }),
        })
    }

    async fn get_receipt(&self, index: usize) -> Result<Value, ThorError> {
        let id = self.tx_id(index)?;
        Ok(match self.chain().get_transaction_receipt(id).await? {
            Some(receipt) => json!({ "found": true, "receipt": receipt }),
            None => json!({ "found": false, "id": to_hex(id) }),
        })
    }

    async fn get_token_balance(&self, index: usize) -> Result<Value, ThorError> {
        let token = self.address("token", index)?;
        let owner = self.address("owner", index)?;
        let balance = TokenContract::new(self.chain(), token).balance_of(owner).await?;
        Ok(json!(balance))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn address(&self, name: &str, index: usize) -> Result<Address, ThorError> {
        let raw = self.get_string(name, index)?;
        parse_address(&raw).map_err(|_| ThorError::InvalidParameter {
            name: name.to_string(),
            value: raw.clone(),
            reason: "expected a 20-byte 0x-prefixed hex address".to_string(),
        })
    }

    fn tx_id(&self, index: usize) -> Result<B256, ThorError> {
        let raw = self.get_string("id", index)?;
        B256::from_str(raw.trim()).map_err(|_| ThorError::InvalidParameter {
            name: "id".to_string(),
            value: raw.clone(),
            reason: "expected a 32-byte 0x-prefixed hex transaction id".to_string(),
        })
    }

    /// Validated clauses of item `index`.
    fn clauses(&self, index: usize) -> Result<Vec<Clause>, ThorError> {
        let (builder, violations) = self.assemble(index)?;
        if !violations.is_empty() {
            return Err(ThorError::Validation(violations));
        }
        builder.build()
    }

    /// Assemble the `clauses` parameter, collecting every problem found.
    ///
    /// Entries with a `type` are intents; entries without one are raw clauses.
    /// Violation indexes refer to positions in the supplied list.
    fn assemble(&self, index: usize) -> Result<(ClauseBuilder, Vec<ClauseViolation>), ThorError> {
        let entries = match self.get_parameter("clauses", index)? {
            Value::Array(entries) => entries,
            other => return Err(invalid("clauses", other, "expected an array")),
        };

        let mut builder = ClauseBuilder::new();
        let mut positions = Vec::with_capacity(entries.len());
        let mut violations = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            match parse_entry(entry).and_then(|intent| builder.add_intent(&intent).map(|_| ())) {
                Ok(()) => positions.push(position),
                Err(e) => violations.push(ClauseViolation::at(position, "intent", e.to_string())),
            }
        }

        for mut violation in builder.validate() {
            match violation.index {
                Some(i) => violation.index = positions.get(i).copied(),
                // Failed intents already explain an empty list
                None if !violations.is_empty() => continue,
                None => {}
            }
            violations.push(violation);
        }
        violations.sort_by_key(|v| v.index);
        Ok((builder, violations))
    }
}

fn parse_entry(entry: &Value) -> Result<ClauseIntent, ThorError> {
    let parsed = if entry.get("type").is_some() {
        serde_json::from_value::<ClauseIntent>(entry.clone())
    } else {
        serde_json::from_value::<RawClause>(entry.clone()).map(ClauseIntent::Raw)
    };
    parsed.map_err(|e| ThorError::Encoding(format!("malformed clause: {e}")))
}

fn invalid(name: &str, value: &Value, reason: &str) -> ThorError {
    ThorError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
