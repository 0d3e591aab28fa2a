//! Teacher question → SQL → data → answer, in two LLM calls.
//!
//! Public API: [`AskPipeline::answer`]. It renders the recent conversation,
//! asks the selected model for a read-only query (or the word
//! `unnecessary`), gates and runs that query through a [`RowSource`], then
//! asks the same model to explain the rows to the teacher. Nothing is kept
//! between calls.

mod cfg;
mod error;

mod api_types;

pub mod diagnostics;
pub mod history;
pub mod prompt;
pub mod sql_gate;

pub use api_types::{AskInput, ConversationTurn, TurnSender};
pub use cfg::{DEFAULT_CALL_TIMEOUT, DEFAULT_HISTORY_LIMIT, PipelineConfig};
pub use diagnostics::{DiagnosticSink, FileDiagnosticSink, MemorySink, TracingSink};
pub use error::{PipelineError, Stage};
pub use sql_gate::{GateRejection, QueryPlan};

use std::sync::Arc;

use ai_llm_service::{CompletionProvider, ProviderRegistry};
use serde_json::Value;
use student_store::RowSource;
use tracing::{debug, info, instrument, warn};

use prompt::PromptContext;

/// Stateless orchestrator shared by all requests.
pub struct AskPipeline {
    providers: Arc<ProviderRegistry>,
    store: Arc<dyn RowSource>,
    sink: Arc<dyn DiagnosticSink>,
    cfg: PipelineConfig,
}

impl AskPipeline {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        store: Arc<dyn RowSource>,
        sink: Arc<dyn DiagnosticSink>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            providers,
            store,
            sink,
            cfg,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Produces the final answer text for one teacher question.
    ///
    /// # Errors
    /// - [`PipelineError::Validation`] for a blank question.
    /// - [`PipelineError::UnsafeQuery`] when the generated statement is not a
    ///   single read; the database is not touched.
    /// - [`PipelineError::Provider`] / [`PipelineError::Store`] /
    ///   [`PipelineError::Timeout`] from the external calls.
    #[instrument(skip_all, fields(student_id = ?input.student_id, model = ?input.model))]
    pub async fn answer(&self, input: AskInput) -> Result<String, PipelineError> {
        let result = self.run(&input).await;
        match &result {
            Ok(_) => self.note("pipeline finished").await,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "ask failed");
                self.note(&format!("{}: {e}", e.kind())).await;
            }
        }
        result
    }

    async fn run(&self, input: &AskInput) -> Result<String, PipelineError> {
        let question = input.question.trim();
        if question.is_empty() {
            return Err(PipelineError::Validation("question must not be empty".into()));
        }

        let llm = self.providers.resolve(input.model);
        if input.model.is_some_and(|m| m != llm.provider()) {
            debug!(requested = ?input.model, used = %llm.provider(), "provider fallback");
        }
        self.note(&format!("model selected: {}", llm.provider())).await;
        self.note(&format!("question: {question}")).await;

        let history = history::format_history(&input.history, self.cfg.history_limit);
        let ctx = PromptContext {
            question,
            student_id: input.student_id,
            student_name: input.student_name.trim(),
            history: &history,
        };

        // 1) question -> query plan
        let raw = self
            .complete(Stage::QueryGeneration, llm.as_ref(), &prompt::query_prompt(&ctx))
            .await?;
        let plan = sql_gate::plan_from_response(&raw);
        self.note(&format!("generated query: {plan}")).await;

        // 2) gate + fetch
        let rows = match &plan {
            QueryPlan::Unnecessary => None,
            QueryPlan::Sql(sql) => {
                sql_gate::check_read_only(sql).map_err(PipelineError::UnsafeQuery)?;
                Some(self.fetch(sql).await?)
            }
        };

        // 3) rows -> answer
        let data = match &rows {
            Some(rows) => serde_json::to_string(rows)
                .map_err(|e| PipelineError::Unknown(format!("row serialization: {e}")))?,
            None => "false".to_string(),
        };
        self.note(&format!("retrieved data: {data}")).await;

        let answer = self
            .complete(
                Stage::AnswerSynthesis,
                llm.as_ref(),
                &prompt::answer_prompt(&ctx, &data),
            )
            .await?;
        self.note(&format!("final answer: {answer}")).await;

        info!(
            provider = %llm.provider(),
            used_data = rows.is_some(),
            rows = rows.as_ref().map_or(0, Vec::len),
            "ask answered"
        );
        Ok(answer)
    }

    async fn complete(
        &self,
        stage: Stage,
        llm: &dyn CompletionProvider,
        prompt: &str,
    ) -> Result<String, PipelineError> {
        let budget = self.cfg.call_timeout;
        match tokio::time::timeout(budget, llm.complete(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(PipelineError::from_llm(stage, e, budget)),
            Err(_) => Err(PipelineError::Timeout {
                stage,
                after: budget,
            }),
        }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Value>, PipelineError> {
        let budget = self.cfg.call_timeout;
        match tokio::time::timeout(budget, self.store.fetch_rows(sql)).await {
            Ok(rows) => Ok(rows?),
            Err(_) => Err(PipelineError::Timeout {
                stage: Stage::DataRetrieval,
                after: budget,
            }),
        }
    }

    async fn note(&self, line: &str) {
        self.sink.record(line).await;
    }
}
