use super::AppState;
use crate::entity::EntityId;
use crate::fleet::IngestOutcome;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Batch position report
#[derive(Deserialize)]
struct PositionBatch {
    vessels: Vec<Value>,
}

/// Response for vessel removal
#[derive(Serialize)]
struct RemoveResponse {
    removed: String,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create router with position ingestion endpoints
pub fn create_ingestion_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/positions", post(ingest_positions))
        .route("/api/vessels/:id", delete(remove_vessel))
        .with_state(state)
}

/// POST /api/positions - Upsert a batch of vessel records
async fn ingest_positions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestOutcome>, AppError> {
    let batch: PositionBatch =
        serde_json::from_slice(&body).map_err(|e| AppError::ValidationError(e.to_string()))?;

    let outcome = state.fleet.ingest(&batch.vessels);
    info!(
        accepted = outcome.accepted,
        rejected = outcome.rejected,
        "Ingested position batch"
    );

    Ok(Json(outcome))
}

/// DELETE /api/vessels/:id - Remove a vessel from the fleet
async fn remove_vessel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, AppError> {
    let numeric = id.parse::<i64>().ok().map(EntityId::Number);
    let removed = numeric
        .and_then(|key| state.fleet.remove(&key))
        .or_else(|| state.fleet.remove(&EntityId::Text(id.clone())))
        .ok_or(AppError::NotFound)?;

    Ok(Json(RemoveResponse {
        removed: removed.id.to_string(),
    }))
}

#[derive(Debug)]
enum AppError {
    ValidationError(String),
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Vessel not found".to_string()),
        };
        let body = Json(ErrorResponse {
            error: error_message,
        });
        (status, body).into_response()
    }
}
