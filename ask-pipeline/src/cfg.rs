//! Pipeline knobs.

use std::time::Duration;

/// Number of conversational turns kept for prompts.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Upper bound for each external call (either LLM call or the query).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub history_limit: usize,
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
