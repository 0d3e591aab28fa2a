use std::sync::Arc;

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
mod routes;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

pub use crate::core::{app_config::AppConfig, app_state::AppState};
pub use error_handler::{AppError, AppResult};
pub use middleware_layer::bearer_auth::{AuthUser, JwtVerifier, TokenVerifier};

use crate::middleware_layer::bearer_auth::require_bearer;
use crate::routes::{
    ask::ask_route::ask_route,
    health::{health_route::health_route, test_db_route::test_db_route},
};

/// All routes. `/ask` sits behind bearer auth; probes are open.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/ask", post(ask_route))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .merge(protected)
        .route("/test-db", get(test_db_route))
        .route("/health", get(health_route))
        .with_state(state)
}

pub async fn start(cfg: AppConfig) -> Result<(), AppError> {
    let state = Arc::new(AppState::from_config(&cfg).await?);
    let app = router(state.clone());

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!(%addr, "listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    state.sink.flush().await;
    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
