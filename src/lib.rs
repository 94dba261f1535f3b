pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod explain;
pub mod extractor;
pub mod limiter;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod server;
pub mod validator;

pub use error::{Result, Text2SqlError, ValidationError};
pub use execution::{QueryStore, SqliteStore, TabularResult};
pub use llm::GenerationCapability;
pub use pipeline::{Pipeline, QuestionRequest, Text2SqlResponse};
