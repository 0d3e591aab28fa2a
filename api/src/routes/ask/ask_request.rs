use ai_llm_service::LlmProvider;
use ask_pipeline::{AskInput, ConversationTurn};
use serde::{Deserialize, Serialize};

use crate::error_handler::AppError;

/// Request payload for `POST /ask`, in the web client's field names.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(rename = "studentId", default)]
    pub student_id: Option<StudentId>,
    #[serde(rename = "IaModel", default)]
    pub ia_model: Option<String>,
    #[serde(rename = "alumnoNombre", default)]
    pub alumno_nombre: Option<String>,
    #[serde(rename = "msgHistory", default)]
    pub msg_history: Vec<ConversationTurn>,
}

/// The client sends the id either as a number or as the route param string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StudentId {
    Number(i64),
    Text(String),
}

impl StudentId {
    fn parse(self) -> Result<Option<i64>, AppError> {
        match self {
            StudentId::Number(n) => Ok(Some(n)),
            StudentId::Text(s) if s.trim().is_empty() => Ok(None),
            StudentId::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::Validation("studentId must be an integer".into())),
        }
    }
}

impl AskRequest {
    /// Validates wire fields. Unknown model ids map to `None`, i.e. the
    /// default provider.
    pub fn into_input(self) -> Result<AskInput, AppError> {
        let student_id = match self.student_id {
            Some(id) => id.parse()?,
            None => None,
        };
        Ok(AskInput {
            question: self.question,
            student_id,
            student_name: self.alumno_nombre.unwrap_or_default(),
            model: self.ia_model.as_deref().and_then(LlmProvider::from_wire),
            history: self.msg_history,
        })
    }
}

/// Response payload for `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}
