//! Decoding of the query-generation reply and the read-only gate.
//!
//! The model either answers with one SQL statement or with the sentinel
//! word `unnecessary`. Replies are often wrapped in Markdown fences or
//! quotes; [`plan_from_response`] peels those off before deciding.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel the model returns when no data is needed.
pub const UNNECESSARY: &str = "unnecessary";

static READ_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(SELECT|WITH)\b").expect("static regex"));

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|CREATE|DROP|ALTER|TRUNCATE|REPLACE|GRANT|REVOKE)\b",
    )
    .expect("static regex")
});

// Language tag of a one-line fence such as "```sql SELECT 1```".
static INLINE_FENCE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(sql|postgresql|postgres|pgsql|psql)\s+").expect("static regex")
});

/// What the first LLM call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// The question can be answered without data.
    Unnecessary,
    /// A candidate statement, still ungated.
    Sql(String),
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPlan::Unnecessary => f.write_str(UNNECESSARY),
            QueryPlan::Sql(sql) => f.write_str(sql),
        }
    }
}

/// Why a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    Empty,
    ForbiddenKeyword(String),
    NotARead,
    MultipleStatements,
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateRejection::Empty => f.write_str("empty statement"),
            GateRejection::ForbiddenKeyword(k) => write!(f, "forbidden keyword {k}"),
            GateRejection::NotARead => f.write_str("statement must start with SELECT or WITH"),
            GateRejection::MultipleStatements => f.write_str("more than one statement"),
        }
    }
}

/// Removes one surrounding Markdown code fence (with optional language tag).
/// Text without a fence comes back trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let t = raw.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Skip the info string (`sql`, `postgresql`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => match INLINE_FENCE_TAG.find(rest) {
            Some(tag) => &rest[tag.end()..],
            None => rest,
        },
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn is_sentinel(text: &str) -> bool {
    text.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .trim_end_matches('.')
        .eq_ignore_ascii_case(UNNECESSARY)
}

/// Turns the raw model reply into a [`QueryPlan`].
pub fn plan_from_response(raw: &str) -> QueryPlan {
    let body = strip_code_fence(raw);
    if body.is_empty() || is_sentinel(body) {
        QueryPlan::Unnecessary
    } else {
        QueryPlan::Sql(body.to_string())
    }
}

/// Accepts a single read statement only.
///
/// Keyword matching is lexical: a forbidden word inside a string literal
/// also rejects. The store additionally runs the statement in a read-only
/// transaction.
pub fn check_read_only(sql: &str) -> Result<(), GateRejection> {
    let body = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.is_empty() {
        return Err(GateRejection::Empty);
    }
    if let Some(m) = FORBIDDEN.find(body) {
        return Err(GateRejection::ForbiddenKeyword(m.as_str().to_ascii_uppercase()));
    }
    if !READ_START.is_match(body) {
        return Err(GateRejection::NotARead);
    }
    if body.contains(';') {
        return Err(GateRejection::MultipleStatements);
    }
    Ok(())
}
