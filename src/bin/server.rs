//! HTTP server exposing `/health` and `/text2sql`.

use anyhow::{Context, Result};
use std::sync::Arc;
use text2sql::api::AppState;
use text2sql::config::Settings;
use text2sql::{llm, logging, server, Pipeline, SqliteStore};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    // Fails fast when the selected backend has no credentials.
    let settings = Settings::from_env().context("failed to load settings")?;

    let store = SqliteStore::open(&settings.db_path, settings.db_read_only)?;
    let llm = llm::from_settings(&settings)?;
    let state = AppState::new(Pipeline::new(llm, Arc::new(store)));

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("Starting text2sql API server");

    server::serve(listener, state).await?;
    Ok(())
}
