// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::ThorError;
use crate::indexer::IndexerError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ThorError> for ApiError {
    fn from(err: ThorError) -> Self {
        let status = match &err {
            ThorError::InvalidUnit(_)
            | ThorError::InvalidAmount { .. }
            | ThorError::InvalidAddress(_)
            | ThorError::InvalidParameter { .. }
            | ThorError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            ThorError::Encoding(_)
            | ThorError::Validation(_)
            | ThorError::SimulationReverted(_)
            | ThorError::Signing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ThorError::DelegationFailed(_) => StatusCode::BAD_GATEWAY,
            ThorError::ChainUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::Chain(e) => e.into(),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}
