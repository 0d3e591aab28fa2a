//! Default provider configs built from an environment snapshot.
//!
//! Each provider is enabled only when its API key is present, so a deployment
//! can run with any non-empty subset of the three backends.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_MAX_TOKENS`        = optional max tokens (u32) applied to every provider
//! - `LLM_CALL_TIMEOUT_SECS` = transport timeout (default 30)
//! - `LLM_DEFAULT_PROVIDER`  = fallback wire id (default `gemini`)
//!
//! Per provider (`GEMINI_*`, `GROQ_*`, `MISTRAL_*`):
//! - `*_API_KEY` = enables the provider
//! - `*_MODEL`   = model id override
//! - `*_URL`     = API base override

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, EnvVars, env_opt_u32, env_opt_u64, opt_env,
        validate_http_endpoint,
    },
};

/// Default per-call timeout, shared with the pipeline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

struct ProviderDefaults {
    provider: LlmProvider,
    key_var: &'static str,
    model_var: &'static str,
    url_var: &'static str,
    model: &'static str,
    endpoint: &'static str,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

const DEFAULTS: [ProviderDefaults; 3] = [
    ProviderDefaults {
        provider: LlmProvider::Gemini,
        key_var: "GEMINI_API_KEY",
        model_var: "GEMINI_MODEL",
        url_var: "GEMINI_URL",
        model: "gemini-2.0-flash",
        endpoint: "https://generativelanguage.googleapis.com",
        max_tokens: None,
        temperature: None,
    },
    ProviderDefaults {
        provider: LlmProvider::GroqLlama,
        key_var: "GROQ_API_KEY",
        model_var: "GROQ_MODEL",
        url_var: "GROQ_URL",
        model: "llama-3.3-70b-versatile",
        endpoint: "https://api.groq.com/openai",
        max_tokens: Some(1024),
        temperature: Some(0.7),
    },
    ProviderDefaults {
        provider: LlmProvider::Mistral,
        key_var: "MISTRAL_API_KEY",
        model_var: "MISTRAL_MODEL",
        url_var: "MISTRAL_URL",
        model: "mistral-medium",
        endpoint: "https://api.mistral.ai",
        max_tokens: None,
        temperature: None,
    },
];

/// Builds the config for `provider`, or `Ok(None)` when its API key is unset.
///
/// # Errors
///
/// - [`ConfigError::InvalidNumber`] for malformed `LLM_MAX_TOKENS` / `LLM_CALL_TIMEOUT_SECS`
/// - [`ConfigError::InvalidFormat`] if the endpoint override is not http(s)
pub fn config_for(
    vars: &EnvVars,
    provider: LlmProvider,
) -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(d) = DEFAULTS.iter().find(|d| d.provider == provider) else {
        return Ok(None);
    };
    let Some(api_key) = opt_env(vars, d.key_var) else {
        return Ok(None);
    };

    let endpoint = opt_env(vars, d.url_var).unwrap_or_else(|| d.endpoint.to_string());
    validate_http_endpoint(d.url_var, &endpoint)?;

    let max_tokens = env_opt_u32(vars, "LLM_MAX_TOKENS")?.or(d.max_tokens);
    let timeout_secs =
        env_opt_u64(vars, "LLM_CALL_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(Some(LlmModelConfig {
        provider,
        model: opt_env(vars, d.model_var).unwrap_or_else(|| d.model.to_string()),
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: d.temperature,
        top_p: None,
        timeout_secs: Some(timeout_secs),
    }))
}

/// Configs for every provider that has credentials, in priority order.
///
/// # Errors
/// [`ConfigError::NoProviders`] when none is configured, plus any
/// error from [`config_for`].
pub fn configured_providers(vars: &EnvVars) -> Result<Vec<LlmModelConfig>, AiLlmError> {
    let mut out = Vec::with_capacity(LlmProvider::ALL.len());
    for p in LlmProvider::ALL {
        if let Some(cfg) = config_for(vars, p)? {
            out.push(cfg);
        }
    }
    if out.is_empty() {
        return Err(ConfigError::NoProviders.into());
    }
    Ok(out)
}

/// Resolves `LLM_DEFAULT_PROVIDER` (default `gemini`).
///
/// # Errors
/// [`ConfigError::UnsupportedProvider`] for an unknown id.
pub fn default_provider(vars: &EnvVars) -> Result<LlmProvider, AiLlmError> {
    match opt_env(vars, "LLM_DEFAULT_PROVIDER") {
        None => Ok(LlmProvider::Gemini),
        Some(id) => LlmProvider::from_wire(&id)
            .ok_or_else(|| ConfigError::UnsupportedProvider(id).into()),
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

    #[test]
    fn provider_without_key_is_skipped() {
        let v = vars(&[("GROQ_API_KEY", "gsk")]);
        let cfgs = configured_providers(&v).unwrap();
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].provider, LlmProvider::GroqLlama);
        assert_eq!(cfgs[0].model, "llama-3.3-70b-versatile");
        assert_eq!(cfgs[0].max_tokens, Some(1024));
        assert_eq!(cfgs[0].timeout_secs, Some(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn no_keys_is_an_error() {
        assert!(matches!(
            configured_providers(&EnvVars::new()),
            Err(AiLlmError::Config(ConfigError::NoProviders))
        ));
    }

    #[test]
    fn overrides_are_applied() {
        let v = vars(&[
            ("MISTRAL_API_KEY", "m"),
            ("MISTRAL_MODEL", "mistral-small"),
            ("MISTRAL_URL", "http://localhost:9000"),
            ("LLM_CALL_TIMEOUT_SECS", "5"),
        ]);
        let cfg = config_for(&v, LlmProvider::Mistral).unwrap().unwrap();
        assert_eq!(cfg.model, "mistral-small");
        assert_eq!(cfg.endpoint, "http://localhost:9000");
        assert_eq!(cfg.timeout_secs, Some(5));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let v = vars(&[("GEMINI_API_KEY", "g"), ("GEMINI_URL", "ftp://x")]);
        assert!(config_for(&v, LlmProvider::Gemini).is_err());
    }

    #[test]
    fn default_provider_parses_wire_id() {
        assert_eq!(default_provider(&EnvVars::new()).unwrap(), LlmProvider::Gemini);
        let v = vars(&[("LLM_DEFAULT_PROVIDER", "mixtral")]);
        assert_eq!(default_provider(&v).unwrap(), LlmProvider::Mistral);
        let v = vars(&[("LLM_DEFAULT_PROVIDER", "claude")]);
        assert!(default_provider(&v).is_err());
    }
}
