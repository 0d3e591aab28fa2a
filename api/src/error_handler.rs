use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ai_llm_service::AiLlmError;
use ask_pipeline::PipelineError;
use serde::Serialize;
use student_store::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::middleware_layer::bearer_auth::AuthError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("database unavailable: {0}")]
    DatabaseUnavailable(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) if e.is_forbidden() => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            AppError::Pipeline(e) => match e {
                PipelineError::Validation(_) | PipelineError::UnsafeQuery(_) => {
                    StatusCode::BAD_REQUEST
                }
                PipelineError::Provider { .. } => StatusCode::BAD_GATEWAY,
                PipelineError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            // startup-only
            AppError::MissingEnv(_)
            | AppError::InvalidEnv { .. }
            | AppError::Llm(_)
            | AppError::Store(_)
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingEnv(_) | AppError::InvalidEnv { .. } => "CONFIG_ERROR",
            AppError::Llm(_) | AppError::Store(_) => "STARTUP_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(e) if e.is_forbidden() => "FORBIDDEN",
            AppError::Auth(_) => "UNAUTHORIZED",
            AppError::DatabaseUnavailable(_) => "STORE_ERROR",
            AppError::Pipeline(e) => match e {
                PipelineError::Validation(_) => "VALIDATION_ERROR",
                PipelineError::UnsafeQuery(_) => "UNSAFE_QUERY",
                PipelineError::Provider { .. } => "PROVIDER_ERROR",
                PipelineError::Store(_) => "STORE_ERROR",
                PipelineError::Timeout { .. } => "TIMEOUT",
                PipelineError::Unknown(_) => "UNKNOWN_ERROR",
            },
        }
    }

    /// What the client sees. Upstream and database details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(detail) => format!("Invalid request: {detail}"),
            AppError::Auth(e) => e.to_string(),
            AppError::DatabaseUnavailable(_) => "The database is not reachable.".into(),
            AppError::Pipeline(e) => match e {
                PipelineError::Validation(detail) => format!("Invalid request: {detail}"),
                PipelineError::UnsafeQuery(_) => {
                    "The generated query was rejected as unsafe. Try rephrasing the question."
                        .into()
                }
                PipelineError::Provider { .. } => {
                    "The language model could not produce an answer.".into()
                }
                PipelineError::Store(_) => "The student database is not available.".into(),
                PipelineError::Timeout { .. } => "The answer took too long. Try again.".into(),
                PipelineError::Unknown(_) => "Unexpected error.".into(),
            },
            _ => "Internal server error.".into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        if status.is_server_error() {
            error!(%status, code, error = %self, "request failed");
        } else {
            warn!(%status, code, error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.public_message(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::Validation(err.body_text())
    }
}
