//! Completion providers for the teacher assistant.
//!
//! Three interchangeable backends (Gemini, Groq, Mistral) are exposed through
//! one [`CompletionProvider`] contract and selected via [`ProviderRegistry`].

pub mod completion;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod registry;
pub mod services;
pub mod telemetry;

pub use completion::CompletionProvider;
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError, ProviderError, ProviderErrorKind};
pub use health_service::{HealthService, HealthStatus};
pub use registry::ProviderRegistry;
