//! Read API routes.
//!
//! Every endpoint answers with the [`ApiResponse`] envelope. Invalid query
//! parameters map to `400 Bad Request`, store failures to
//! `500 Internal Server Error`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::core::AlertFilter;
use crate::query::{HistoryWindow, QueryService};

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read-side projections
    pub query: QueryService,
}

impl AppState {
    /// Create state over a query service
    pub fn new(query: QueryService) -> Self {
        Self { query }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Error message on failure
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Failed response
    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

/// `GET /protocols/:name/history` parameters
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Look-back window in days, 1..=365
    pub days: Option<String>,
}

/// `GET /alerts` parameters
#[derive(Debug, Deserialize)]
pub struct AlertParams {
    /// `open` or `resolved`; anything else lists every alert
    pub status: Option<String>,
}

fn respond<T: Serialize>(result: crate::error::Result<T>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::ok(data)).into_response(),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                error!(error = %e, code = e.code(), "Query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ApiResponse::<()>::err(e.to_string()))).into_response()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "protocol-monitor",
        "version": crate::VERSION
    }))
}

/// GET /protocols - Latest snapshot and status per protocol
async fn list_protocols(State(state): State<Arc<AppState>>) -> Response {
    respond(state.query.protocol_statuses())
}

/// GET /protocols/:name/history - Snapshot history
async fn protocol_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let result = HistoryWindow::from_query(params.days.as_deref())
        .and_then(|window| state.query.protocol_history(&name, window));
    respond(result)
}

/// GET /alerts - Alert log, newest first
async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertParams>,
) -> Response {
    respond(state.query.alerts(AlertFilter::from_query(params.status.as_deref())))
}

/// Fallback for unknown routes
async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::err("Not found"))).into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the read API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/protocols", get(list_protocols))
        .route("/protocols/:name/history", get(protocol_history))
        .route("/alerts", get(list_alerts))
        .fallback(not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::new(state))
}
