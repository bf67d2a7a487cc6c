//! Health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub schema_current: bool,
}

/// `GET /health`: 200 when the database answers with an up-to-date schema,
/// 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let schema_current = database
        && state
            .db
            .migration_status()
            .await
            .map(|status| status.is_current())
            .unwrap_or(false);

    let (code, status) = if schema_current {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (code, Json(HealthResponse { status, database, schema_current }))
}
