use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{OrchestrationError, Result};
use crate::llm::{Completion, CompletionRequest, LlmBackend, Message, TokenUsage};

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// OpenAI-compatible chat completions backend.
pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_retries: u32,
    retry_base: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiBackend {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            OrchestrationError::ConfigError(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrchestrationError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_base: BASE_BACKOFF,
        })
    }

    /// Exponential delay before retry `attempt` (0-based), without jitter
    pub fn base_backoff(attempt: u32) -> Duration {
        Self::scaled_backoff(BASE_BACKOFF, attempt)
    }

    fn scaled_backoff(base: Duration, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(16));
        base.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Backoff plus up to half the base delay of jitter
    fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let max_jitter = (self.retry_base / 2).as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        Self::scaled_backoff(self.retry_base, attempt) + Duration::from_millis(jitter)
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.or(self.max_tokens),
        }
    }

    fn parse_response(body: &str) -> Result<Completion> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| OrchestrationError::LlmError(format!("Malformed completion response: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OrchestrationError::LlmError("Completion response has no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            usage,
        })
    }

    /// One HTTP round trip; retryable failures come back as `NetworkError`
    async fn send_once(&self, request: &CompletionRequest) -> Result<Completion> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| OrchestrationError::NetworkError(format!("Failed to reach LLM endpoint: {}", e)))?;

        let status = response.status();
        // a connection dropped mid-body is a transport failure like any other
        let body = response
            .text()
            .await
            .map_err(|e| OrchestrationError::NetworkError(format!("Failed to read LLM response body: {}", e)))?;

        if status.is_success() {
            Self::parse_response(&body)
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(OrchestrationError::NetworkError(format!("LLM endpoint returned {}: {}", status, body)).into())
        } else {
            Err(OrchestrationError::LlmError(format!("LLM endpoint returned {}: {}", status, body)).into())
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(completion) => {
                    debug!("Completion received from {} after {} retries", self.model, attempt);
                    return Ok(completion);
                }
                Err(e) => {
                    let retryable = e
                        .downcast_ref::<OrchestrationError>()
                        .map(OrchestrationError::is_retryable)
                        .unwrap_or(false);
                    if !retryable || attempt >= self.max_retries {
                        return Err(e);
                    }

                    let delay = self.backoff_with_jitter(attempt);
                    warn!(
                        "LLM call failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn name(&self) -> String {
        format!("openai ({})", self.model)
    }
}
