//! POST /ask — answers a teacher question about the selected student.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    middleware_layer::bearer_auth::AuthUser,
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /ask
///
/// # Example
/// ```bash
/// curl -X POST http://localhost:5000/ask \
///   -H 'authorization: Bearer <jwt>' \
///   -H 'content-type: application/json' \
///   -d '{"question":"How many errors did this student make?","studentId":42,"IaModel":"mixtral","alumnoNombre":"Lucía","msgHistory":[]}'
/// ```
#[instrument(name = "ask_route", skip_all, fields(user = %user.user_id, role = %user.role))]
pub async fn ask_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Json<AskResponse>> {
    let Json(body) = payload?;
    let input = body.into_input()?;

    let answer = state.pipeline.answer(input).await?;
    info!(answer_len = answer.len(), "answer ready");

    Ok(Json(AskResponse { answer }))
}
