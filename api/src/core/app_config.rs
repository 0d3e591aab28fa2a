//! Process configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;

use ai_llm_service::{
    LlmModelConfig, LlmProvider,
    config::default_config::{DEFAULT_TIMEOUT_SECS, configured_providers, default_provider},
    error_handler::{EnvVars, env_opt_u64, opt_env},
};
use student_store::StoreConfig;

use crate::error_handler::AppError;

/// Sentinel for `LLM_LOG_PATH` that routes diagnostics to `tracing`.
pub const LOG_TO_TRACING: &str = "stdout";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub llm_providers: Vec<LlmModelConfig>,
    pub default_provider: LlmProvider,
    pub call_timeout: Duration,
    /// `None` sends diagnostic lines to `tracing` instead of a file.
    pub log_path: Option<PathBuf>,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Snapshot of the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        let vars: EnvVars = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &EnvVars) -> Result<Self, AppError> {
        let jwt_secret = opt_env(vars, "JWT_SECRET").ok_or(AppError::MissingEnv("JWT_SECRET"))?;

        let port = match opt_env(vars, "SERVER_PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| AppError::InvalidEnv {
                var: "SERVER_PORT",
                reason: e.to_string(),
            })?,
            None => 5000,
        };

        let call_timeout = Duration::from_secs(
            env_opt_u64(vars, "LLM_CALL_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        );
        if call_timeout.is_zero() {
            return Err(AppError::InvalidEnv {
                var: "LLM_CALL_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let log_path = match opt_env(vars, "LLM_LOG_PATH") {
            Some(p) if p.eq_ignore_ascii_case(LOG_TO_TRACING) => None,
            Some(p) => Some(PathBuf::from(p)),
            None => Some(PathBuf::from("./llms-data.log")),
        };

        // A stalled database must fail inside the per-call budget so it
        // reports as a store error, not a timeout.
        let mut store = StoreConfig::from_vars(vars)?;
        if store.connect_timeout >= call_timeout {
            store.connect_timeout = call_timeout / 2;
        }

        Ok(Self {
            host: opt_env(vars, "HOST").unwrap_or_else(|| "localhost".into()),
            port,
            jwt_secret,
            llm_providers: configured_providers(vars)?,
            default_provider: default_provider(vars)?,
            call_timeout,
            log_path,
            store,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("JWT_SECRET", "s3cret"),
            ("GROQ_API_KEY", "gsk-test"),
            ("DB_NAME", "tdah"),
            ("DB_USER", "app"),
        ]
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_vars(&vars(&minimal())).unwrap();
        assert_eq!(cfg.bind_address(), "localhost:5000");
        assert_eq!(cfg.call_timeout, Duration::from_secs(30));
        assert_eq!(cfg.log_path, Some(PathBuf::from("./llms-data.log")));
        assert_eq!(cfg.default_provider, LlmProvider::Gemini);
        assert_eq!(cfg.llm_providers.len(), 1);
        assert_eq!(cfg.llm_providers[0].provider, LlmProvider::GroqLlama);
        assert_eq!(cfg.store.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn overrides() {
        let mut pairs = minimal();
        pairs.extend([
            ("HOST", "0.0.0.0"),
            ("SERVER_PORT", "8080"),
            ("LLM_CALL_TIMEOUT_SECS", "5"),
            ("LLM_LOG_PATH", "stdout"),
            ("LLM_DEFAULT_PROVIDER", "groq-llama"),
        ]);
        let cfg = AppConfig::from_vars(&vars(&pairs)).unwrap();
        assert_eq!(cfg.bind_address(), "0.0.0.0:8080");
        assert_eq!(cfg.call_timeout, Duration::from_secs(5));
        assert_eq!(cfg.log_path, None);
        assert_eq!(cfg.default_provider, LlmProvider::GroqLlama);
        // Store checkout stays shorter than the call budget.
        assert_eq!(cfg.store.connect_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn missing_secret_or_bad_port_fails() {
        let no_secret: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "JWT_SECRET")
            .collect();
        assert!(matches!(
            AppConfig::from_vars(&vars(&no_secret)),
            Err(AppError::MissingEnv("JWT_SECRET"))
        ));

        let mut bad_port = minimal();
        bad_port.push(("SERVER_PORT", "http"));
        assert!(matches!(
            AppConfig::from_vars(&vars(&bad_port)),
            Err(AppError::InvalidEnv {
                var: "SERVER_PORT",
                ..
            })
        ));
    }

    #[test]
    fn no_provider_key_fails() {
        let pairs: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "GROQ_API_KEY")
            .collect();
        assert!(matches!(
            AppConfig::from_vars(&vars(&pairs)),
            Err(AppError::Llm(_))
        ));
    }
}
