use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::routes::ApiState;
use crate::storage::check_connection;

/// Liveness plus a database round trip.
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    match check_connection(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
        }
    }
}
