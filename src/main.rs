use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use text2sql::config::Settings;
use text2sql::{llm, logging, Pipeline, QuestionRequest, SqliteStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "text2sql")]
#[command(about = "Answer a natural-language question with a read-only SQL query")]
struct Args {
    /// The question in natural language
    question: String,

    /// Optional clarifications appended to the question
    #[arg(short, long)]
    assumptions: Option<String>,

    /// Row cap applied when the query has none (1..=10000)
    #[arg(short, long, default_value_t = text2sql::pipeline::DEFAULT_LIMIT)]
    limit: u32,

    /// Do not add a row cap
    #[arg(long, conflicts_with = "limit")]
    no_limit: bool,

    /// SQLite database (overrides DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut settings = Settings::from_env().context("failed to load settings")?;
    if let Some(path) = args.db_path {
        settings.db_path = path;
    }

    let store = SqliteStore::open(&settings.db_path, settings.db_read_only)?;
    let llm = llm::from_settings(&settings)?;
    let pipeline = Pipeline::new(llm, Arc::new(store));

    let request = QuestionRequest {
        question: args.question,
        assumptions: args.assumptions,
        limit: if args.no_limit { None } else { Some(args.limit) },
    };
    info!("Running question against {}", settings.db_path.display());

    let response = pipeline.run(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["text2sql", "How many orders?"]).unwrap();
        assert_eq!(args.question, "How many orders?");
        assert_eq!(args.limit, 500);
        assert!(!args.no_limit);
    }

    #[test]
    fn test_no_limit_conflicts_with_limit() {
        assert!(Args::try_parse_from(["text2sql", "q", "--limit", "5", "--no-limit"]).is_err());
    }
}
