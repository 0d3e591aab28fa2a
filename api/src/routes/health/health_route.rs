use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

/// Public view of one provider probe. Endpoints and upstream error text
/// stay in the server log.
#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: &'static str,
}

impl From<&HealthStatus> for ProviderHealth {
    fn from(s: &HealthStatus) -> Self {
        Self {
            provider: s.provider.clone(),
            model: s.model.clone(),
            ok: s.ok,
            latency_ms: s.latency_ms,
            message: if s.ok { "available" } else { "unavailable" },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub default_provider: String,
    pub providers: Vec<ProviderHealth>,
}

/// Handler: GET /health. Always 200; `status` is `degraded` when any
/// configured provider fails its probe. Probes run at most once per
/// cache window.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state
        .health_cache
        .get_or_refresh(|| state.providers.health_all(&state.health))
        .await;
    let status = if snapshot.iter().all(|p| p.ok) {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status,
        default_provider: state.providers.default_provider().to_string(),
        providers: snapshot.iter().map(ProviderHealth::from).collect(),
    })
}
