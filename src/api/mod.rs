// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod clauses;
pub mod health;
pub mod transactions;
pub mod trigger;
pub mod units;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let v1_routes = Router::new()
        .route("/units/convert", post(units::convert_units))
        .route("/clauses/validate", post(clauses::validate_clauses))
        .route("/transactions", post(transactions::execute_batch))
        .route("/transactions/{id}", get(transactions::get_transaction))
        .route("/transactions/{id}/receipt", get(transactions::get_receipt))
        .route("/trigger/poll", post(trigger::poll_now));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        units::convert_units,
        clauses::validate_clauses,
        transactions::execute_batch,
        transactions::get_transaction,
        transactions::get_receipt,
        trigger::poll_now
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            units::ConvertRequest,
            units::ConvertResponse,
            clauses::ValidateClausesRequest,
            transactions::BatchRequest,
            transactions::BatchResponse
        )
    ),
    tags(
        (name = "Health", description = "Service and node health"),
        (name = "Units", description = "Amount conversion"),
        (name = "Clauses", description = "Clause assembly and validation"),
        (name = "Transactions", description = "Build, sign, submit and look up transactions"),
        (name = "Trigger", description = "Block polling trigger")
    )
)]
struct ApiDoc;
