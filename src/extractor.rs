//! Query Extractor
//!
//! Turns free-form generator output into a single candidate SQL string.
//! Tolerates markdown fences, the legacy `{"sql_query": ...}` JSON wrapper,
//! conversational prefixes and trailing commentary.

use crate::error::{Result, Text2SqlError};
use tracing::debug;

const FENCE: &str = "```";

const FENCE_LANGUAGE_TAGS: &[&str] = &["sql", "sqlite"];

const CONVERSATIONAL_PREFIXES: &[&str] = &[
    "sql query:",
    "query:",
    "sql:",
    "answer:",
    "result:",
    "here's the sql:",
    "here is the sql:",
    "the sql query is:",
];

/// Lines starting with any of these end the query.
const STOP_MARKERS: &[&str] = &[
    "this query",
    "explanation:",
    "this will",
    "note:",
    "the above",
    "this sql",
    "//",
    "--",
    "#",
];

const LEGACY_FIELD: &str = "sql_query";

/// Characters of raw model output quoted back in a parsing error.
const MAX_QUOTED_OUTPUT: usize = 300;

/// Extract one `;`-terminated candidate query from `model_output`.
pub fn extract_sql_query(model_output: &str) -> Result<String> {
    let content = strip_code_fence(model_output.trim());

    if let Some(legacy) = legacy_sql_field(&content) {
        debug!("Extracted SQL from legacy JSON wrapper");
        return finalize(&legacy).ok_or_else(|| unusable_output(model_output));
    }

    let content = strip_conversational_prefix(&content);

    let mut sql_lines = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if STOP_MARKERS.iter().any(|marker| starts_with_ignore_case(line, marker)) {
            break;
        }
        sql_lines.push(line);
    }

    finalize(&sql_lines.join(" ")).ok_or_else(|| unusable_output(model_output))
}

fn strip_code_fence(content: &str) -> String {
    if !content.starts_with(FENCE) {
        return content.to_string();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() == 1 {
        let inner = content.trim_start_matches(FENCE);
        let inner = inner.strip_suffix(FENCE).unwrap_or(inner);
        return inner.trim().to_string();
    }

    let mut start = 1;
    if FENCE_LANGUAGE_TAGS
        .iter()
        .any(|tag| lines[1].trim().eq_ignore_ascii_case(tag))
    {
        start = 2;
    }

    let end = lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| line.trim() == FENCE)
        .map(|(idx, _)| idx)
        .unwrap_or(lines.len());

    lines[start.min(end)..end].join("\n").trim().to_string()
}

fn legacy_sql_field(content: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(content).ok()?;
    let value = parsed.as_object()?.get(LEGACY_FIELD)?;
    Some(match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn strip_conversational_prefix(content: &str) -> String {
    for prefix in CONVERSATIONAL_PREFIXES {
        if starts_with_ignore_case(content, prefix) {
            return content[prefix.len()..].trim().to_string();
        }
    }
    content.to_string()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Normalize to exactly one trailing terminator; `None` when nothing is left.
fn finalize(sql: &str) -> Option<String> {
    let body = sql
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.is_empty() {
        return None;
    }
    Some(format!("{};", body))
}

fn unusable_output(model_output: &str) -> Text2SqlError {
    let mut quoted: String = model_output.chars().take(MAX_QUOTED_OUTPUT).collect();
    if model_output.chars().nth(MAX_QUOTED_OUTPUT).is_some() {
        quoted.push_str("...");
    }
    Text2SqlError::Parsing(format!(
        "No valid SQL query found in model output: {:?}",
        quoted
    ))
}
