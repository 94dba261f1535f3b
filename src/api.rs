//! HTTP API
//!
//! Route dispatch for `/health` and `/text2sql`, independent of the socket
//! layer in [`crate::server`].

use crate::error::Text2SqlError;
use crate::pipeline::{Pipeline, QuestionRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_connected: bool,
    pub db_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|e| {
            error!("Failed to serialize response: {}", e);
            r#"{"detail":"Failed to serialize response"}"#.to_string()
        });
        Self { status, body }
    }

    pub fn error(err: &Text2SqlError) -> Self {
        Self::json(
            err.status_code(),
            &ErrorBody {
                detail: err.to_string(),
            },
        )
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        _ => "Internal Server Error",
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub async fn route(state: &AppState, method: &str, path: &str, body: &str) -> ApiResponse {
    match (method, path) {
        ("OPTIONS", _) => ApiResponse::empty(204),
        ("GET", "/health") => health(state).await,
        ("POST", "/text2sql") => text2sql(state, body).await,
        (_, "/health") | (_, "/text2sql") => ApiResponse::json(
            405,
            &ErrorBody {
                detail: "Method Not Allowed".to_string(),
            },
        ),
        _ => ApiResponse::json(
            404,
            &ErrorBody {
                detail: "Not Found".to_string(),
            },
        ),
    }
}

async fn health(state: &AppState) -> ApiResponse {
    let store = state.pipeline.store();
    ApiResponse::json(
        200,
        &HealthResponse {
            status: "ok".to_string(),
            db_connected: store.ping().await,
            db_path: store.location(),
        },
    )
}

async fn text2sql(state: &AppState, body: &str) -> ApiResponse {
    let request: QuestionRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return ApiResponse::error(&Text2SqlError::InvalidRequest(e.to_string())),
    };

    match state.pipeline.run(&request).await {
        Ok(response) => ApiResponse::json(200, &response),
        Err(e) => ApiResponse::error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_uses_status_and_detail() {
        let resp = ApiResponse::error(&Text2SqlError::Execution("no such table: X".to_string()));
        assert_eq!(resp.status, 400);
        let body: ErrorBody = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body.detail, "SQL execution error: no such table: X");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(422), "Unprocessable Entity");
        assert_eq!(status_text(500), "Internal Server Error");
    }
}
