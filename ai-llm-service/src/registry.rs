//! Closed map from [`LlmProvider`] to a live [`CompletionProvider`].
//!
//! - Construct once at startup, wrap in `Arc`, and share across requests.
//! - Holds no per-request state; lookups are read-only.
//! - Unknown or unconfigured providers resolve to the designated default.
//!
//! # Example
//! ```no_run
//! use ai_llm_service::{LlmModelConfig, LlmProvider, ProviderRegistry};
//!
//! # async fn run() -> Result<(), ai_llm_service::AiLlmError> {
//! let groq = LlmModelConfig {
//!     provider: LlmProvider::GroqLlama,
//!     model: "llama-3.3-70b-versatile".into(),
//!     endpoint: "https://api.groq.com/openai".into(),
//!     api_key: Some("gsk-...".into()),
//!     max_tokens: Some(1024),
//!     temperature: Some(0.7),
//!     top_p: None,
//!     timeout_secs: Some(30),
//! };
//! let registry = ProviderRegistry::from_configs(vec![groq], LlmProvider::GroqLlama)?;
//! let text = registry.resolve(LlmProvider::from_wire("gemini")).complete("Hi").await?;
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};

use crate::{
    completion::CompletionProvider,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{gemini_service::GeminiService, open_ai_service::OpenAiService},
};

/// Provider lookup with a guaranteed fallback.
pub struct ProviderRegistry {
    providers: HashMap<LlmProvider, Arc<dyn CompletionProvider>>,
    default: LlmProvider,
    configs: Vec<LlmModelConfig>,
}

impl ProviderRegistry {
    /// Builds HTTP clients for every config and registers them.
    ///
    /// If `preferred_default` is not among `configs`, the first configured
    /// provider becomes the default.
    ///
    /// # Errors
    /// - [`ConfigError::NoProviders`] if `configs` is empty
    /// - any client construction error from the provider services
    pub fn from_configs(
        configs: Vec<LlmModelConfig>,
        preferred_default: LlmProvider,
    ) -> Result<Self, AiLlmError> {
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::with_capacity(configs.len());
        for cfg in &configs {
            let svc: Arc<dyn CompletionProvider> = match cfg.provider {
                LlmProvider::Gemini => Arc::new(GeminiService::new(cfg.clone())?),
                LlmProvider::GroqLlama | LlmProvider::Mistral => {
                    Arc::new(OpenAiService::new(cfg.clone())?)
                }
            };
            providers.push(svc);
        }

        let mut registry = Self::from_providers(providers, preferred_default)?;
        registry.configs = configs;
        Ok(registry)
    }

    /// Registers ready-made providers (e.g., stubs in tests).
    ///
    /// # Errors
    /// [`ConfigError::NoProviders`] if `providers` is empty.
    pub fn from_providers(
        providers: Vec<Arc<dyn CompletionProvider>>,
        preferred_default: LlmProvider,
    ) -> Result<Self, AiLlmError> {
        let first = providers
            .first()
            .map(|p| p.provider())
            .ok_or(ConfigError::NoProviders)?;

        let map: HashMap<_, _> = providers.into_iter().map(|p| (p.provider(), p)).collect();

        let default = if map.contains_key(&preferred_default) {
            preferred_default
        } else {
            warn!(
                preferred = %preferred_default,
                fallback = %first,
                "preferred default provider is not configured; using fallback"
            );
            first
        };

        let mut registered: Vec<_> = map.keys().map(|p| p.wire_id()).collect();
        registered.sort_unstable();
        info!(default = %default, providers = ?registered, "provider registry ready");

        Ok(Self {
            providers: map,
            default,
            configs: Vec::new(),
        })
    }

    /// Returns the provider for `requested`, or the default one when the
    /// request is `None` or names a provider that is not configured.
    pub fn resolve(&self, requested: Option<LlmProvider>) -> Arc<dyn CompletionProvider> {
        if let Some(p) = requested.and_then(|r| self.providers.get(&r)) {
            return Arc::clone(p);
        }
        if let Some(r) = requested {
            warn!(requested = %r, default = %self.default, "provider not configured; falling back");
        }
        // `from_providers` guarantees the default is registered.
        Arc::clone(&self.providers[&self.default])
    }

    /// The provider used when a request names none or an unknown one.
    pub fn default_provider(&self) -> LlmProvider {
        self.default
    }

    /// Whether `provider` has a live client.
    pub fn is_registered(&self, provider: LlmProvider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Probes every provider built from configs. Stub-only registries
    /// report nothing.
    pub async fn health_all(&self, health: &HealthService) -> Vec<HealthStatus> {
        health.check_many(&self.configs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(LlmProvider);

    #[async_trait]
    impl CompletionProvider for Fixed {
        fn provider(&self) -> LlmProvider {
            self.0
        }

        async fn complete(&self, _prompt: &str) -> Result<String, AiLlmError> {
            Ok(self.0.wire_id().to_string())
        }
    }

    fn registry(ps: &[LlmProvider], default: LlmProvider) -> ProviderRegistry {
        let providers = ps
            .iter()
            .map(|p| Arc::new(Fixed(*p)) as Arc<dyn CompletionProvider>)
            .collect();
        ProviderRegistry::from_providers(providers, default).unwrap()
    }

    #[tokio::test]
    async fn resolves_requested_provider() {
        let r = registry(
            &[LlmProvider::Gemini, LlmProvider::Mistral],
            LlmProvider::Gemini,
        );
        let p = r.resolve(Some(LlmProvider::Mistral));
        assert_eq!(p.complete("x").await.unwrap(), "mixtral");
    }

    #[tokio::test]
    async fn unknown_or_missing_falls_back_to_default() {
        let r = registry(
            &[LlmProvider::Gemini, LlmProvider::Mistral],
            LlmProvider::Gemini,
        );
        assert_eq!(r.resolve(None).provider(), LlmProvider::Gemini);
        assert_eq!(
            r.resolve(Some(LlmProvider::GroqLlama)).provider(),
            LlmProvider::Gemini
        );
    }

    #[test]
    fn unconfigured_default_uses_first_provider() {
        let r = registry(&[LlmProvider::GroqLlama], LlmProvider::Gemini);
        assert_eq!(r.default_provider(), LlmProvider::GroqLlama);
        assert!(r.is_registered(LlmProvider::GroqLlama));
        assert!(!r.is_registered(LlmProvider::Gemini));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(ProviderRegistry::from_providers(Vec::new(), LlmProvider::Gemini).is_err());
    }
}
