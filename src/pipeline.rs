//! Pipeline Orchestrator
//!
//! One pass per request: generate SQL, extract, validate, cap, execute,
//! explain. Stage-local failures become categorized [`Text2SqlError`]s;
//! the explaining stage always recovers.

use crate::error::{Result, Text2SqlError};
use crate::execution::{QueryStore, TabularResult};
use crate::explain::generate_explanation;
use crate::extractor::extract_sql_query;
use crate::limiter::apply_row_cap;
use crate::llm::GenerationCapability;
use crate::prompts::sql_generation_conversation;
use crate::validator::validate_query;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_LIMIT: u32 = 500;
pub const MAX_LIMIT: u32 = 10_000;

fn default_limit() -> Option<u32> {
    Some(DEFAULT_LIMIT)
}

/// Inbound question. An absent `limit` means 500; an explicit `null` means
/// no cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub assumptions: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: Option<u32>,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            assumptions: None,
            limit: default_limit(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(Text2SqlError::InvalidRequest(format!(
                    "limit must be between 1 and {}, got {}",
                    MAX_LIMIT, limit
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text2SqlResponse {
    pub sql_query: String,
    pub explanation: String,
    pub results: TabularResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    GeneratingSql,
    Extracting,
    Validating,
    Limiting,
    Executing,
    Explaining,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::GeneratingSql => "generating-sql",
            Stage::Extracting => "extracting",
            Stage::Validating => "validating",
            Stage::Limiting => "limiting",
            Stage::Executing => "executing",
            Stage::Explaining => "explaining",
            Stage::Responded => "responded",
        };
        write!(f, "{}", name)
    }
}

pub struct Pipeline {
    llm: Arc<dyn GenerationCapability>,
    store: Arc<dyn QueryStore>,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn GenerationCapability>, store: Arc<dyn QueryStore>) -> Self {
        Self { llm, store }
    }

    pub fn store(&self) -> &dyn QueryStore {
        self.store.as_ref()
    }

    pub async fn run(&self, request: &QuestionRequest) -> Result<Text2SqlResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!("text2sql", %request_id);
        self.run_stages(request).instrument(span).await
    }

    async fn run_stages(&self, request: &QuestionRequest) -> Result<Text2SqlResponse> {
        let mut stage = Stage::Received;
        let result = self.advance(request, &mut stage).await;
        match &result {
            Ok(_) => debug!("stage: {}", Stage::Responded),
            Err(e) => warn!("Request failed at {}: {}", stage, e),
        }
        result
    }

    async fn advance(
        &self,
        request: &QuestionRequest,
        stage: &mut Stage,
    ) -> Result<Text2SqlResponse> {
        request.validate()?;
        info!("Question: {}", request.question);

        enter(stage, Stage::GeneratingSql);
        let conversation =
            sql_generation_conversation(&request.question, request.assumptions.as_deref());
        let raw = self
            .llm
            .submit(&conversation)
            .await
            .map_err(into_generation_error)?;

        enter(stage, Stage::Extracting);
        let sql_query = extract_sql_query(&raw)?;
        info!("Candidate SQL: {}", sql_query);

        enter(stage, Stage::Validating);
        validate_query(&sql_query)?;

        enter(stage, Stage::Limiting);
        let sql_to_run = apply_row_cap(&sql_query, request.limit);

        enter(stage, Stage::Executing);
        info!("Executing SQL: {}", sql_to_run);
        let results = self.store.execute(&sql_to_run).await?;

        enter(stage, Stage::Explaining);
        let explanation =
            generate_explanation(self.llm.as_ref(), &request.question, &sql_query, &results).await;

        Ok(Text2SqlResponse {
            sql_query,
            explanation: explanation.into_text(),
            results,
        })
    }
}

fn enter(current: &mut Stage, next: Stage) {
    debug!("stage: {} -> {}", current, next);
    *current = next;
}

/// Anything the generator raises while producing SQL is an internal error.
fn into_generation_error(err: Text2SqlError) -> Text2SqlError {
    match err {
        Text2SqlError::Generation(_) => err,
        other => Text2SqlError::Generation(other.to_string()),
    }
}
