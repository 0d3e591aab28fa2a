//! Prompt builders for the two LLM calls.
//!
//! Both prompts end with the same labeled sections so the model can find
//! the history and the question regardless of the instruction block above.

use student_store::schema::describe_schema;

/// Fields shared by both prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub question: &'a str,
    pub student_id: Option<i64>,
    pub student_name: &'a str,
    /// Already rendered by [`crate::history::format_history`].
    pub history: &'a str,
}

const QUERY_ROLE: &str = "\
You are a PostgreSQL expert helping a teacher look up exactly the data they need
about the performance of students with ADHD. Reply with ONE read-only SQL SELECT
statement, or with the single word \"unnecessary\". Nothing else: no Markdown code
fences, no comments, no explanations.

Your statement will be executed and its rows handed to a second assistant that
writes the final answer for the teacher.";

const QUERY_RULES: &str = "\
Rules:
- Only SELECT (or WITH ... SELECT) statements. Never modify data.
- If the question can be answered without data, reply only with \"unnecessary\".
- Read the conversation history together with the current question to work out
  what is being asked.
- If you have the student id, NEVER filter by name.
- When aggregating, alias columns in the language of the TEACHER QUESTION.
- When the teacher asks for recommendations, strategies or an evaluation, even
  indirectly, select all relevant performance data (exercise types, success
  rates, progression over time) so the next step has enough to work with.
- The statement must not fail at execution time: guard every division against
  zero with CASE. Keep it as efficient and accurate as possible.";

const ANSWER_ROLE: &str = "\
You are an assistant specialised in educational data analysis for teachers of
students with ADHD. Help the teacher interpret exercise data so they can make
better pedagogical decisions.

You receive the recent conversation and the rows a previous step extracted from
the exercise database with a SQL query.";

const ANSWER_RULES: &str = "\
Rules:
- Be clear, brief, visual and assertive. Focus on actionable classroom insights.
- Always reply in the language of the TEACHER QUESTION. Translate database
  values (exercise types, difficulties) into that language; never show raw
  column values.
- Use inclusive and respectful language.
- If the data is not enough for a meaningful answer, say so politely.
- If the data is false and the question is general, answer without data and
  say at the start that no database data supports the answer.";

fn student_rule(ctx: &PromptContext<'_>) -> String {
    match ctx.student_id {
        Some(id) => format!(
            "- If the question is about a specific student, even implicitly (\"this student\"),\n  \
             filter with: WHERE id_alumno = {id} (this is the id of {name}).\n\
             - If the teacher names a student that matches {name} (typos included), use that id.\n  \
             If the name does not match, reply only with \"unnecessary\".",
            name = ctx.student_name,
        ),
        None => "- No student is selected. For questions about one specific student reply only\n  \
                 with \"unnecessary\"."
            .to_string(),
    }
}

fn name_rule(ctx: &PromptContext<'_>) -> String {
    if ctx.student_name.trim().is_empty() {
        return "- No student is selected; do not invent student names.".to_string();
    }
    format!(
        "- If the question names a student matching {name} (typos included), use the\n  \
         correct spelling. Otherwise tell the teacher the name was not found.",
        name = ctx.student_name,
    )
}

/// Prompt for the first call: schema, rules, history, question.
pub fn query_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "{QUERY_ROLE}\n\nDatabase schema:\n\n{schema}\n{QUERY_RULES}\n{student}\n\n\
         CONVERSATION HISTORY (for context):\n{history}\n\n\
         TEACHER QUESTION: {question}\n",
        schema = describe_schema(),
        student = student_rule(ctx),
        history = ctx.history,
        question = ctx.question,
    )
}

/// Prompt for the second call. `data` is the JSON row array, or the literal
/// `false` when no query ran.
pub fn answer_prompt(ctx: &PromptContext<'_>, data: &str) -> String {
    format!(
        "{ANSWER_ROLE}\n\n{ANSWER_RULES}\n{names}\n\n\
         RECENT CONVERSATION HISTORY (for context):\n{history}\n\n\
         TEACHER QUESTION: {question}\n\n\
         DATABASE AI-EXTRACTED DATA (false if no extraction was needed): {data}\n",
        names = name_rule(ctx),
        history = ctx.history,
        question = ctx.question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(id: Option<i64>, history: &'a str) -> PromptContext<'a> {
        PromptContext {
            question: "¿Cómo va en matemáticas?",
            student_id: id,
            student_name: "Lucía",
            history,
        }
    }

    #[test]
    fn query_prompt_carries_schema_student_and_sections() {
        let p = query_prompt(&ctx(Some(7), "Teacher: hola"));
        assert!(p.contains("ejercicios ("));
        assert!(p.contains("WHERE id_alumno = 7 (this is the id of Lucía)"));
        assert!(p.contains("CONVERSATION HISTORY (for context):\nTeacher: hola"));
        assert!(p.trim_end().ends_with("TEACHER QUESTION: ¿Cómo va en matemáticas?"));
    }

    #[test]
    fn query_prompt_without_student() {
        let p = query_prompt(&ctx(None, "(none)"));
        assert!(!p.contains("WHERE id_alumno ="));
        assert!(p.contains("No student is selected"));
    }

    #[test]
    fn answer_prompt_embeds_data_verbatim() {
        let p = answer_prompt(&ctx(Some(7), "(none)"), "[{\"media\":8.5}]");
        assert!(p.contains("DATABASE AI-EXTRACTED DATA"));
        assert!(p.trim_end().ends_with("[{\"media\":8.5}]"));

        let p = answer_prompt(&ctx(Some(7), "(none)"), "false");
        assert!(p.trim_end().ends_with(": false"));
    }

    #[test]
    fn prompts_are_deterministic() {
        let c = ctx(Some(3), "Teacher: a\nAI Assistant: b");
        assert_eq!(query_prompt(&c), query_prompt(&c));
        assert_eq!(answer_prompt(&c, "[]"), answer_prompt(&c, "[]"));
    }
}
