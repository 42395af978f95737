//! The reasoning oracle seam and its OpenAI-compatible HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::AdjudicationError;

/// Default chat model used for adjudication.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An external reasoning process: text prompt in, free-form text out.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AdjudicationError>;
}

/// Chat-completions client (`POST {base_url}/chat/completions`).
pub struct OpenAiOracle {
    http: reqwest::Client,
    base_url: String,
    api_key: Zeroizing<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiOracle {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), DEFAULT_BASE_URL, api_key, DEFAULT_MODEL)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key.into()),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ReasoningOracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, AdjudicationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [ChatMessage { role: "user", content: prompt }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "querying reasoning oracle");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AdjudicationError::Oracle(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdjudicationError::Oracle(format!("status {}: {}", status.as_u16(), text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdjudicationError::Oracle(format!("undecodable response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AdjudicationError::EmptyResponse)
    }
}
