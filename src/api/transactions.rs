// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction endpoints: batched workflow execution and lookups.

use std::str::FromStr;

use alloy::primitives::B256;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    blockchain::{Receipt, TransactionDetail},
    error::ApiError,
    state::AppState,
    workflow::{ExecutionContext, Operation},
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// A batch of workflow items sharing one operation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Defaults to `sendTransaction`
    #[serde(default = "default_operation")]
    #[schema(value_type = String, example = "sendTransaction")]
    pub operation: Operation,
    /// One parameter object per item, e.g. `{"clauses": [...], "options": {...}}`
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Value>,
    /// Report per-item failures instead of aborting the batch
    #[serde(default)]
    pub continue_on_fail: bool,
}

fn default_operation() -> Operation {
    Operation::SendTransaction
}

/// One result per item, in input order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchResponse {
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Value>,
}

fn parse_tx_id(raw: &str) -> Result<B256, ApiError> {
    B256::from_str(raw.trim())
        .map_err(|_| {
            ApiError::bad_request(format!(
                "Invalid transaction id `{raw}`: expected 0x + 64 hex chars"
            ))
        })
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/transactions",
    tag = "Transactions",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Per-item results", body = BatchResponse),
        (status = 400, description = "Invalid parameter"),
        (status = 422, description = "Invalid clauses, encoding or signing failure"),
        (status = 502, description = "Delegation service failed"),
        (status = 503, description = "Thor node unavailable")
    )
)]
pub async fn execute_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let ctx = ExecutionContext::new(state.credentials.clone(), request.items)?;
    tracing::debug!(
        operation = ?request.operation,
        items = ctx.item_count(),
        continue_on_fail = request.continue_on_fail,
        "Executing workflow batch"
    );
    let results = ctx.execute(request.operation, request.continue_on_fail).await?;
    Ok(Json(BatchResponse { results }))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/{id}",
    tag = "Transactions",
    params(
        ("id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Transaction found"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Transaction not known to the node"),
        (status = 503, description = "Thor node unavailable")
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDetail>, ApiError> {
    let tx_id = parse_tx_id(&id)?;
    state
        .chain()
        .get_transaction(tx_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Transaction {id} not found")))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/{id}/receipt",
    tag = "Transactions",
    params(
        ("id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Receipt found"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Receipt not available yet"),
        (status = 503, description = "Thor node unavailable")
    )
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Receipt>, ApiError> {
    let tx_id = parse_tx_id(&id)?;
    state
        .chain()
        .get_transaction_receipt(tx_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Receipt for {id} not found")))
}
