use super::AppState;
use crate::entity::{EntityId, TrackedEntity};
use crate::fleet::VesselQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for vessel listing
#[derive(Debug, Default, Deserialize)]
pub struct VesselQueryParams {
    /// Region filter; "global" or absent means every region
    pub region: Option<String>,
    /// Maximum vessels returned (capped by the server's max limit)
    pub limit: Option<u32>,
    /// 1-based page over id order
    pub page: Option<u32>,
}

/// Pull endpoint response body
#[derive(Serialize)]
pub struct VesselListResponse {
    pub vessels: Vec<TrackedEntity>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/vessels", get(list_vessels))
        .route("/api/vessels/:id", get(get_vessel))
        .with_state(state)
}

/// GET /api/vessels - List vessels
///
/// Query parameters:
/// - `region`: e.g. ?region=europe (case-insensitive)
/// - `limit`: page size, defaults to and capped at the server max
/// - `page`: 1-based page, defaults to 1
async fn list_vessels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VesselQueryParams>,
) -> Result<Json<VesselListResponse>, QueryError> {
    let max = state.settings.max_limit;
    let limit = params.limit.unwrap_or(max);
    if limit == 0 {
        return Err(QueryError::InvalidLimit);
    }

    let vessels = state.fleet.query(&VesselQuery {
        region: params.region.unwrap_or_default(),
        page: params.page.unwrap_or(1),
        page_size: limit.min(max),
        load_all: false,
    });

    Ok(Json(VesselListResponse { vessels }))
}

/// GET /api/vessels/:id - Get one vessel (numeric ids first, then string ids)
async fn get_vessel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrackedEntity>, QueryError> {
    let numeric = id.parse::<i64>().ok().map(EntityId::Number);
    let vessel = numeric
        .and_then(|id| state.fleet.get(&id))
        .or_else(|| state.fleet.get(&EntityId::Text(id)))
        .ok_or(QueryError::NotFound)?;

    Ok(Json(vessel))
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
    InvalidLimit,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "Vessel not found"),
            QueryError::InvalidLimit => (StatusCode::BAD_REQUEST, "limit must be at least 1"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}
