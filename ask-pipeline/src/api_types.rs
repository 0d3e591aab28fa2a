//! Public API types re-used by external crates (e.g., the HTTP API layer).

use ai_llm_service::LlmProvider;
use serde::Deserialize;

/// Who wrote a chat message, as tagged by the web client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TurnSender {
    /// The teacher (`"user"` on the wire).
    #[serde(rename = "user")]
    Teacher,
    /// A previous model answer (`"LLMS"` on the wire).
    #[serde(rename = "LLMS")]
    Assistant,
    /// Visual divider between conversations; carries no content.
    #[serde(rename = "separator")]
    Separator,
    /// Anything else the client may send; ignored like a separator.
    #[serde(other)]
    Other,
}

/// One message of the caller-held conversation. Never persisted.
///
/// # Example
/// ```
/// use ask_pipeline::{ConversationTurn, TurnSender};
/// let t: ConversationTurn =
///     serde_json::from_str(r#"{"text":"How is she doing?","sender":"user"}"#).unwrap();
/// assert_eq!(t.sender, TurnSender::Teacher);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub text: String,
    pub sender: TurnSender,
}

impl ConversationTurn {
    pub fn teacher(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: TurnSender::Teacher,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: TurnSender::Assistant,
        }
    }

    pub fn separator() -> Self {
        Self {
            text: String::new(),
            sender: TurnSender::Separator,
        }
    }
}

/// Everything one `/ask` call needs.
#[derive(Debug, Clone)]
pub struct AskInput {
    /// Teacher's question, must be non-blank.
    pub question: String,
    /// Currently selected student, if any.
    pub student_id: Option<i64>,
    /// Display name of the selected student (used for fuzzy name checks).
    pub student_name: String,
    /// Requested provider; `None` means "use the default".
    pub model: Option<LlmProvider>,
    /// Recent conversation, oldest first.
    pub history: Vec<ConversationTurn>,
}
