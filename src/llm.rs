use crate::config::{LlmBackend, Settings};
use crate::error::{Result, Text2SqlError};
use crate::prompts::Conversation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Black-box text generator: a conversation in, one completion out.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    async fn submit(&self, conversation: &Conversation) -> Result<String>;
}

/// Sampling parameters sent with every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// Build the backend selected in `settings`.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn GenerationCapability>> {
    let timeout = Duration::from_secs(settings.llm_timeout_secs);
    match &settings.backend {
        LlmBackend::Watsonx {
            url,
            api_key,
            project_id,
            model_id,
        } => {
            info!("Using watsonx.ai model {} at {}", model_id, url);
            Ok(Arc::new(WatsonxClient::new(
                url.clone(),
                api_key.clone(),
                project_id.clone(),
                model_id.clone(),
                timeout,
            )?))
        }
        LlmBackend::OpenAi {
            base_url,
            api_key,
            model,
        } => {
            info!("Using OpenAI-compatible model {} at {}", model, base_url);
            Ok(Arc::new(OpenAiClient::new(
                base_url.clone(),
                api_key.clone(),
                model.clone(),
                timeout,
            )?))
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Text2SqlError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Pull `choices[0].message.content` out of a chat completion body.
fn completion_content(response_json: &serde_json::Value) -> Result<String> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Text2SqlError::Generation("No content in LLM response".to_string()))
}

async fn read_json(response: reqwest::Response, what: &str) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Text2SqlError::Generation(format!(
            "{} returned {}: {}",
            what, status, body
        )));
    }
    response
        .json()
        .await
        .map_err(|e| Text2SqlError::Generation(format!("Failed to parse {} response: {}", what, e)))
}

const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";
const WATSONX_API_VERSION: &str = "2024-10-08";
/// Refresh the bearer token this long before IBM says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct BearerToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

/// IBM watsonx.ai chat endpoint, authenticated by exchanging an API key
/// for an IAM bearer token.
pub struct WatsonxClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    project_id: String,
    model_id: String,
    params: GenerationParams,
    token: Mutex<Option<BearerToken>>,
}

impl WatsonxClient {
    pub fn new(
        url: String,
        api_key: String,
        project_id: String,
        model_id: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            model_id,
            params: GenerationParams::default(),
            token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting IAM bearer token");
        let response = self
            .client
            .post(IAM_TOKEN_URL)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Text2SqlError::Generation(format!("IAM token request failed: {}", e)))?;
        let body = read_json(response, "IAM token endpoint").await?;
        let token: IamTokenResponse = serde_json::from_value(body)
            .map_err(|e| {
                Text2SqlError::Generation(format!("Malformed IAM token response: {}", e))
            })?;

        let value = token.access_token.clone();
        *cached = Some(BearerToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }
}

#[async_trait]
impl GenerationCapability for WatsonxClient {
    async fn submit(&self, conversation: &Conversation) -> Result<String> {
        let token = self.bearer_token().await?;
        let body = serde_json::json!({
            "model_id": self.model_id,
            "project_id": self.project_id,
            "messages": conversation.messages,
            "max_tokens": self.params.max_tokens,
            "temperature": self.params.temperature,
            "top_p": self.params.top_p,
            "frequency_penalty": self.params.frequency_penalty,
            "presence_penalty": self.params.presence_penalty,
        });

        let response = self
            .client
            .post(format!(
                "{}/ml/v1/text/chat?version={}",
                self.url, WATSONX_API_VERSION
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Text2SqlError::Generation(format!("LLM API call failed: {}", e)))?;

        let response_json = read_json(response, "watsonx.ai").await?;
        completion_content(&response_json)
    }
}

/// Any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params: GenerationParams::default(),
        })
    }
}

#[async_trait]
impl GenerationCapability for OpenAiClient {
    async fn submit(&self, conversation: &Conversation) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": conversation.messages,
            "temperature": self.params.temperature,
            "top_p": self.params.top_p,
            "frequency_penalty": self.params.frequency_penalty,
            "presence_penalty": self.params.presence_penalty,
            "max_tokens": self.params.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Text2SqlError::Generation(format!("LLM API call failed: {}", e)))?;

        let response_json = read_json(response, "chat completions").await?;
        completion_content(&response_json)
    }
}
