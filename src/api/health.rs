// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Network name.
    pub network: String,
    pub chain_tag: u8,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    /// Thor node reachability ("ok" or "unavailable").
    pub node: String,
    /// Best block number, when the node answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_block: Option<u64>,
    /// Poll cursor, when a trigger is configured and has ticked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_cursor: Option<u64>,
}

/// Health check endpoint handler.
///
/// Returns 200 if the node answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Thor node unavailable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let best = state.chain().best_block().await;
    if let Err(e) = &best {
        tracing::warn!(error = %e, "Health check could not reach the node");
    }
    let poll_cursor = state
        .poller
        .as_ref()
        .and_then(|poller| poller.cursor().ok().flatten());

    let healthy = best.is_ok();
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        network: state.credentials.network.name.to_string(),
        chain_tag: state.credentials.network.chain_tag,
        checks: HealthChecks {
            node: if healthy { "ok" } else { "unavailable" }.to_string(),
            best_block: best.ok().map(|block| block.number),
            poll_cursor,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
