// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clause validation endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::workflow::{ExecutionContext, Operation};

/// Clause list to assemble and check.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateClausesRequest {
    /// Intents (`{"type": "transfer", ...}`) or raw clauses (`{to, value, data}`)
    #[schema(value_type = Vec<Object>)]
    pub clauses: Vec<Value>,
}

/// Assemble the clauses and report every violation at once.
///
/// Always 200: problems are reported in `violations`, not as an error.
#[utoipa::path(
    post,
    path = "/v1/clauses/validate",
    tag = "Clauses",
    request_body = ValidateClausesRequest,
    responses(
        (status = 200, description = "Validation report with assembled clauses and gas hint"),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn validate_clauses(
    State(state): State<AppState>,
    Json(request): Json<ValidateClausesRequest>,
) -> Result<Json<Value>, ApiError> {
    let items = vec![json!({ "clauses": request.clauses })];
    let ctx = ExecutionContext::new(state.credentials.clone(), items)?;
    let mut results = ctx.execute(Operation::ValidateClauses, false).await?;
    results
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::bad_request("no clauses supplied"))
}
