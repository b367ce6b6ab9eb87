use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::state::StoreState;
use crate::traits::StoreError;
use crate::types::{
    CreateResponse, ErrorResponse, ProcessedAgentData, ProcessedAgentDataRecord, RecordId,
};
use crate::websocket::handle_websocket;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subscribers: usize,
    pub uptime_seconds: u64,
}

/// Build the HTTP and WebSocket routes
pub fn create_router(state: Arc<StoreState>) -> Router {
    Router::new()
        .route(
            "/processed_agent_data/",
            get(list_processed_agent_data).post(create_processed_agent_data),
        )
        .route(
            "/processed_agent_data/{id}",
            get(read_processed_agent_data)
                .put(update_processed_agent_data)
                .delete(delete_processed_agent_data),
        )
        .route("/ws/", get(handle_websocket))
        .route("/health", get(health_check))
        .with_state(state)
}

fn api_error(e: StoreError) -> ApiError {
    let (status, error, code) = match &e {
        StoreError::NotFound(id) => {
            warn!("Item not found: {}", id);
            (StatusCode::NOT_FOUND, "Item not found".to_string(), "NOT_FOUND")
        }
        StoreError::Database(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), "DATABASE_ERROR")
        }
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

/// Persist a batch and push it to subscribers
pub async fn create_processed_agent_data(
    State(state): State<Arc<StoreState>>,
    Json(batch): Json<Vec<ProcessedAgentData>>,
) -> Result<Json<CreateResponse>, ApiError> {
    let records = state.service.create(batch).await.map_err(api_error)?;

    Ok(Json(CreateResponse {
        message: "Data successfully created".to_string(),
        ids: records.into_iter().map(|r| r.id).collect(),
    }))
}

/// Get a single row by id
pub async fn read_processed_agent_data(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<RecordId>,
) -> Result<Json<ProcessedAgentDataRecord>, ApiError> {
    state.service.read(id).await.map(Json).map_err(api_error)
}

/// List every row
pub async fn list_processed_agent_data(
    State(state): State<Arc<StoreState>>,
) -> Result<Json<Vec<ProcessedAgentDataRecord>>, ApiError> {
    state.service.list().await.map(Json).map_err(api_error)
}

/// Overwrite a row
pub async fn update_processed_agent_data(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<RecordId>,
    Json(data): Json<ProcessedAgentData>,
) -> Result<Json<ProcessedAgentDataRecord>, ApiError> {
    state.service.update(id, data).await.map(Json).map_err(api_error)
}

/// Delete a row, returning it as it was
pub async fn delete_processed_agent_data(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<RecordId>,
) -> Result<Json<ProcessedAgentDataRecord>, ApiError> {
    state.service.delete(id).await.map(Json).map_err(api_error)
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<Arc<StoreState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.service.registry().subscriber_count(),
        uptime_seconds: state.uptime_seconds(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        let (status, Json(body)) = api_error(StoreError::NotFound(7));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Item not found");
        assert_eq!(body.code, "NOT_FOUND");

        let (status, Json(body)) = api_error(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATABASE_ERROR");
    }
}
