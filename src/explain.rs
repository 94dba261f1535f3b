//! Explanation Generator
//!
//! Summarizes a [`TabularResult`] and asks the generation capability to
//! phrase the answer. Any failure degrades to a templated sentence, so this
//! stage never aborts a request.

use crate::execution::TabularResult;
use crate::llm::GenerationCapability;
use crate::prompts::explanation_conversation;
use std::fmt::Write;
use tracing::warn;

/// Rows included in the prompt regardless of the true row count.
pub const MAX_SAMPLE_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explanation {
    Generated(String),
    Fallback(String),
}

impl Explanation {
    pub fn into_text(self) -> String {
        match self {
            Explanation::Generated(text) | Explanation::Fallback(text) => text,
        }
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Prompt-sized summary of `results`.
pub fn format_results_summary(results: &TabularResult) -> String {
    if results.row_count == 0 {
        return "No results found.".to_string();
    }

    let mut summary = format!("Found {}.\n", plural(results.row_count, "result"));
    let _ = writeln!(summary, "Columns: {}", results.columns.join(", "));

    if !results.rows.is_empty() {
        let sample_size = results.rows.len().min(MAX_SAMPLE_ROWS);
        let _ = writeln!(summary, "Sample data (first {}):", plural(sample_size, "row"));
        for (idx, row) in results.rows.iter().take(sample_size).enumerate() {
            let rendered = serde_json::to_string(row).unwrap_or_default();
            let _ = writeln!(summary, "Row {}: {}", idx + 1, rendered);
        }
    }

    summary
}

pub fn fallback_explanation(row_count: usize) -> String {
    format!(
        "Query executed successfully. Found {}.",
        plural(row_count, "result")
    )
}

pub async fn generate_explanation(
    llm: &dyn GenerationCapability,
    question: &str,
    sql: &str,
    results: &TabularResult,
) -> Explanation {
    let summary = format_results_summary(results);
    let conversation = explanation_conversation(question, sql, &summary);

    match llm.submit(&conversation).await {
        Ok(text) if !text.trim().is_empty() => Explanation::Generated(text.trim().to_string()),
        Ok(_) => {
            warn!("Explanation generation returned an empty completion, using fallback");
            Explanation::Fallback(fallback_explanation(results.row_count))
        }
        Err(e) => {
            warn!("Explanation generation failed, using fallback: {}", e);
            Explanation::Fallback(fallback_explanation(results.row_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, Text2SqlError};
    use crate::execution::Row;
    use crate::prompts::Conversation;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String>,
        seen: Mutex<Vec<Conversation>>,
    }

    impl Canned {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(Text2SqlError::Generation("connection reset".to_string())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationCapability for Canned {
        async fn submit(&self, conversation: &Conversation) -> Result<String> {
            self.seen.lock().unwrap().push(conversation.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Text2SqlError::Generation(e.to_string())),
            }
        }
    }

    fn rows(n: usize) -> TabularResult {
        let rows: Vec<Row> = (0..n)
            .map(|i| {
                let mut row = Row::new();
                row.insert("SalesOrder".to_string(), json!(format!("SO-{}", i)));
                row
            })
            .collect();
        TabularResult::new(vec!["SalesOrder".to_string()], rows)
    }

    #[test]
    fn test_summary_for_empty_result() {
        assert_eq!(format_results_summary(&rows(0)), "No results found.");
    }

    #[test]
    fn test_summary_singular() {
        let summary = format_results_summary(&rows(1));
        assert!(summary.starts_with("Found 1 result.\nColumns: SalesOrder\n"));
        assert!(summary.contains("Sample data (first 1 row):"));
        assert!(summary.contains(r#"Row 1: {"SalesOrder":"SO-0"}"#));
    }

    #[test]
    fn test_summary_caps_sample_rows() {
        let summary = format_results_summary(&rows(120));
        assert!(summary.starts_with("Found 120 results."));
        assert!(summary.contains("Sample data (first 50 rows):"));
        assert!(summary.contains("Row 50:"));
        assert!(!summary.contains("Row 51:"));
    }

    #[tokio::test]
    async fn test_generated_text_trimmed() {
        let llm = Canned::ok("  There are 3 orders.\n");
        let explanation = generate_explanation(&llm, "How many?", "SELECT 1;", &rows(3)).await;
        assert_eq!(explanation, Explanation::Generated("There are 3 orders.".to_string()));

        let seen = llm.seen.lock().unwrap();
        let prompt = seen[0].last_user_message().unwrap();
        assert!(prompt.contains("How many?"));
        assert!(prompt.contains("Found 3 results."));
    }

    #[tokio::test]
    async fn test_failure_falls_back_with_row_count() {
        let explanation =
            generate_explanation(&Canned::failing(), "q", "SELECT 1;", &rows(7)).await;
        assert_eq!(
            explanation,
            Explanation::Fallback("Query executed successfully. Found 7 results.".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_completion_falls_back() {
        let explanation =
            generate_explanation(&Canned::ok("   "), "q", "SELECT 1;", &rows(1)).await;
        assert_eq!(
            explanation,
            Explanation::Fallback("Query executed successfully. Found 1 result.".to_string())
        );
    }
}
