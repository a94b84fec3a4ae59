/// Health check endpoint
///
/// ```text
/// GET /api/health-check
/// ```
///
/// ```json
/// {
///   "message": "OK",
///   "status_code": 200,
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// `database` is `connected`, `disconnected` (answered with 503) or
/// `in-memory` when no pool is configured.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub status_code: u16,
    pub version: String,
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(pool) => match agnes_shared::db::health_check(pool).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "disconnected"
            }
        },
        None => "in-memory",
    };

    let (status, message) = if database == "disconnected" {
        (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED")
    } else {
        (StatusCode::OK, "OK")
    };

    (
        status,
        Json(HealthResponse {
            message: message.to_string(),
            status_code: status.as_u16(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }),
    )
}
