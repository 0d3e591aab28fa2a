use std::sync::Arc;

use ai_llm_service::{HealthService, ProviderRegistry};
use ask_pipeline::{
    AskPipeline, DiagnosticSink, FileDiagnosticSink, PipelineConfig, TracingSink,
};
use student_store::{PgStore, RowSource};
use tracing::info;

use crate::{
    core::{
        app_config::AppConfig,
        health_cache::{HEALTH_TTL, HealthCache},
    },
    error_handler::AppError,
    middleware_layer::bearer_auth::{JwtVerifier, TokenVerifier},
};

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub pipeline: AskPipeline,
    pub providers: Arc<ProviderRegistry>,
    pub store: Arc<dyn RowSource>,
    pub sink: Arc<dyn DiagnosticSink>,
    pub health: HealthService,
    /// Last provider probe round, reused for [`HEALTH_TTL`].
    pub health_cache: HealthCache,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Budget for the `/test-db` probe.
    pub probe_timeout: std::time::Duration,
}

impl AppState {
    /// Wires providers, database pool and diagnostic sink from config.
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let providers = Arc::new(ProviderRegistry::from_configs(
            cfg.llm_providers.clone(),
            cfg.default_provider,
        )?);
        let store: Arc<dyn RowSource> = Arc::new(PgStore::connect(&cfg.store).await?);
        let sink: Arc<dyn DiagnosticSink> = match &cfg.log_path {
            Some(path) => {
                info!(path = %path.display(), "diagnostic log file");
                Arc::new(FileDiagnosticSink::new(path.clone()))
            }
            None => Arc::new(TracingSink),
        };
        let verifier = Arc::new(JwtVerifier::hs256(&cfg.jwt_secret));
        let pipeline_cfg = PipelineConfig::default().with_call_timeout(cfg.call_timeout);

        Self::assemble(providers, store, sink, verifier, pipeline_cfg)
    }

    /// Builds state from ready-made parts (stubs in tests).
    pub fn assemble(
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn RowSource>,
        sink: Arc<dyn DiagnosticSink>,
        verifier: Arc<dyn TokenVerifier>,
        pipeline_cfg: PipelineConfig,
    ) -> Result<Self, AppError> {
        let probe_timeout = pipeline_cfg.call_timeout;
        let health = HealthService::new(Some(probe_timeout.as_secs().max(1)))?;
        let pipeline =
            AskPipeline::new(providers.clone(), store.clone(), sink.clone(), pipeline_cfg);
        Ok(Self {
            pipeline,
            providers,
            store,
            sink,
            health,
            health_cache: HealthCache::new(HEALTH_TTL),
            verifier,
            probe_timeout,
        })
    }
}
