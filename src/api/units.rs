// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unit conversion endpoint.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::convert;
use crate::error::ApiError;

/// Request to convert an amount between units.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// Non-negative decimal amount (e.g., "1.5")
    pub value: String,
    /// Source unit: wei, kwei, mwei, gwei, szabo, finney, ether, vet or vtho
    pub from_unit: String,
    /// Target unit
    pub to_unit: String,
}

/// Conversion result.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub value: String,
    pub from_unit: String,
    pub to_unit: String,
    /// Converted amount; fractional digits below one wei are truncated
    pub result: String,
}

#[utoipa::path(
    post,
    path = "/v1/units/convert",
    tag = "Units",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Amount converted", body = ConvertResponse),
        (status = 400, description = "Unknown unit or malformed amount")
    )
)]
pub async fn convert_units(
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let result = convert(&request.value, &request.from_unit, &request.to_unit)?;
    Ok(Json(ConvertResponse {
        value: request.value,
        from_unit: request.from_unit,
        to_unit: request.to_unit,
        result,
    }))
}
