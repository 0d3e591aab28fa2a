//! Conversation history rendering for prompts.

use crate::api_types::{ConversationTurn, TurnSender};

/// Placeholder used when nothing conversational is left after filtering.
pub const EMPTY_HISTORY: &str = "(none)";

/// Keeps only teacher/assistant turns, then the last `limit` of those, and
/// renders them one per line as `Teacher: …` / `AI Assistant: …`.
pub fn format_history(turns: &[ConversationTurn], limit: usize) -> String {
    let kept: Vec<&ConversationTurn> = turns
        .iter()
        .filter(|t| matches!(t.sender, TurnSender::Teacher | TurnSender::Assistant))
        .collect();
    let start = kept.len().saturating_sub(limit);

    let lines: Vec<String> = kept[start..]
        .iter()
        .map(|t| match t.sender {
            TurnSender::Teacher => format!("Teacher: {}", t.text),
            _ => format!("AI Assistant: {}", t.text),
        })
        .collect();

    if lines.is_empty() {
        EMPTY_HISTORY.to_string()
    } else {
        lines.join("\n")
    }
}
