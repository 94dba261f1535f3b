//! Evaluation runner: posts each question to a running server and saves the
//! responses (or error text) to a JSON file.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use text2sql::logging;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "eval")]
#[command(about = "Send a list of questions to the text2sql API and record the answers")]
struct Args {
    /// File with questions: a JSON array of strings, or one question per line
    questions: PathBuf,

    /// Base URL of the server
    #[arg(short, long, env = "TEXT2SQL_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    /// Where to write the collected results
    #[arg(short, long, default_value = "test_results.json")]
    output: PathBuf,

    /// Row cap sent with every question
    #[arg(short, long)]
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EvalRecord {
    question: String,
    status: u16,
    response: serde_json::Value,
}

fn load_questions(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_questions(&text))
}

fn parse_questions(text: &str) -> Vec<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(text) {
        return list;
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let questions = load_questions(&args.questions)?;
    let client = reqwest::Client::new();
    let url = format!("{}/text2sql", args.endpoint.trim_end_matches('/'));
    let mut records = Vec::with_capacity(questions.len());

    for (idx, question) in questions.iter().enumerate() {
        info!("Testing question {}: {}", idx + 1, question);
        let mut body = serde_json::json!({ "question": question });
        if let Some(limit) = args.limit {
            body["limit"] = limit.into();
        }

        let record = match client.post(&url).json(&body).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                let response =
                    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
                if status == 200 {
                    info!("Question {} completed", idx + 1);
                } else {
                    warn!("Question {} failed with status {}", idx + 1, status);
                }
                EvalRecord {
                    question: question.clone(),
                    status,
                    response,
                }
            }
            Err(e) => {
                warn!("Question {} failed: {}", idx + 1, e);
                EvalRecord {
                    question: question.clone(),
                    status: 0,
                    response: serde_json::Value::String(format!("Error: {}", e)),
                }
            }
        };
        records.push(record);
    }

    std::fs::write(&args.output, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("All questions tested, results saved to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions_json_array() {
        let parsed = parse_questions(r#"["How many orders?", "ยอดขายรวม?"]"#);
        assert_eq!(parsed, vec!["How many orders?", "ยอดขายรวม?"]);
    }

    #[test]
    fn test_parse_questions_lines() {
        let parsed = parse_questions("# smoke set\nHow many orders?\n\n  Top plants  \n");
        assert_eq!(parsed, vec!["How many orders?", "Top plants"]);
    }
}
