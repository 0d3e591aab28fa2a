use std::fmt;

/// Completion backend selectable by the frontend.
///
/// The wire identifiers are the values the web client sends in `IaModel`:
///
/// | variant      | wire id      | transport                         |
/// |--------------|--------------|-----------------------------------|
/// | `Gemini`     | `gemini`     | Google `generateContent`          |
/// | `GroqLlama`  | `groq-llama` | OpenAI-compatible chat (Groq)     |
/// | `Mistral`    | `mixtral`    | OpenAI-compatible chat (Mistral)  |
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// assert_eq!(LlmProvider::from_wire("groq-llama"), Some(LlmProvider::GroqLlama));
/// assert_eq!(LlmProvider::from_wire("gpt-9"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Google Gemini.
    Gemini,
    /// Llama 3 served by Groq.
    GroqLlama,
    /// Mistral hosted models.
    Mistral,
}

impl LlmProvider {
    /// All providers in registration priority order.
    pub const ALL: [LlmProvider; 3] = [
        LlmProvider::Gemini,
        LlmProvider::GroqLlama,
        LlmProvider::Mistral,
    ];

    /// Parses a frontend identifier. Matching is case-insensitive and
    /// ignores surrounding whitespace; unknown ids yield `None`.
    pub fn from_wire(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.wire_id().eq_ignore_ascii_case(id))
    }

    /// Identifier used on the wire and in config.
    pub fn wire_id(self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::GroqLlama => "groq-llama",
            LlmProvider::Mistral => "mixtral",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_ids_round_trip() {
        for p in LlmProvider::ALL {
            assert_eq!(LlmProvider::from_wire(p.wire_id()), Some(p));
        }
    }

    #[test]
    fn from_wire_is_lenient_on_case_and_spaces() {
        assert_eq!(LlmProvider::from_wire(" Mixtral "), Some(LlmProvider::Mistral));
        assert_eq!(LlmProvider::from_wire(""), None);
    }
}
