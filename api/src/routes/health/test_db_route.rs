use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
};

#[derive(Debug, Serialize)]
pub struct TestDbResponse {
    pub now: DateTime<Utc>,
}

/// Handler: GET /test-db. Round-trips `SELECT NOW()` through the pool.
pub async fn test_db_route(State(state): State<Arc<AppState>>) -> AppResult<Json<TestDbResponse>> {
    let now = tokio::time::timeout(state.probe_timeout, state.store.ping())
        .await
        .map_err(|_| AppError::DatabaseUnavailable("ping timed out".into()))?
        .map_err(|e| AppError::DatabaseUnavailable(e.to_string()))?;
    Ok(Json(TestDbResponse { now }))
}
