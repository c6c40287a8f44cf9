// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Manual poll tick.

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::indexer::PollOutcome;
use crate::state::AppState;

/// Run one poll tick now.
///
/// Ticks are serialized with the background poller, so this never overlaps
/// a running tick.
#[utoipa::path(
    post,
    path = "/v1/trigger/poll",
    tag = "Trigger",
    responses(
        (
            status = 200,
            description = "Tick outcome: initialized, no_new_blocks, no_matches or events"
        ),
        (status = 404, description = "No trigger configured"),
        (status = 503, description = "Thor node unavailable")
    )
)]
pub async fn poll_now(State(state): State<AppState>) -> Result<Json<PollOutcome>, ApiError> {
    let poller = state
        .poller
        .as_ref()
        .ok_or_else(|| ApiError::not_found("No trigger configured"))?;
    Ok(Json(poller.poll().await?))
}
