//! Typed error for the ask pipeline.

use std::fmt;
use std::time::Duration;

use ai_llm_service::AiLlmError;
use student_store::StoreError;
use thiserror::Error;

use crate::sql_gate::GateRejection;

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    QueryGeneration,
    DataRetrieval,
    AnswerSynthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::QueryGeneration => "query generation",
            Stage::DataRetrieval => "data retrieval",
            Stage::AnswerSynthesis => "answer synthesis",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad caller input (blank question and the like).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The generated statement did not pass the read-only gate.
    #[error("generated query rejected: {0}")]
    UnsafeQuery(GateRejection),

    /// An LLM call failed.
    #[error("LLM call failed during {stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: AiLlmError,
    },

    /// The database refused or failed the query.
    #[error("database error: {0}")]
    Store(#[from] StoreError),

    /// An external call exceeded its time budget.
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Stable kind tag, used in diagnostic lines and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::UnsafeQuery(_) => "UnsafeQueryError",
            PipelineError::Provider { .. } => "ProviderError",
            PipelineError::Store(_) => "StoreError",
            PipelineError::Timeout { .. } => "TimeoutError",
            PipelineError::Unknown(_) => "UnknownError",
        }
    }

    /// Maps an LLM failure, folding transport timeouts into [`PipelineError::Timeout`].
    pub(crate) fn from_llm(stage: Stage, err: AiLlmError, budget: Duration) -> Self {
        match err {
            AiLlmError::Timeout(after) => PipelineError::Timeout { stage, after },
            AiLlmError::HttpTransport(e) if e.is_timeout() => PipelineError::Timeout {
                stage,
                after: budget,
            },
            other => PipelineError::Provider {
                stage,
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            PipelineError::Validation("x".into()).kind(),
            "ValidationError"
        );
        assert_eq!(
            PipelineError::UnsafeQuery(GateRejection::MultipleStatements).kind(),
            "UnsafeQueryError"
        );
        assert_eq!(
            PipelineError::Store(StoreError::Decode("x".into())).kind(),
            "StoreError"
        );
    }

    #[test]
    fn llm_timeout_becomes_pipeline_timeout() {
        let e = PipelineError::from_llm(
            Stage::AnswerSynthesis,
            AiLlmError::Timeout(Duration::from_secs(3)),
            Duration::from_secs(30),
        );
        assert!(matches!(
            e,
            PipelineError::Timeout {
                stage: Stage::AnswerSynthesis,
                after
            } if after == Duration::from_secs(3)
        ));
    }
}
