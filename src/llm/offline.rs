use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{OrchestrationError, Result};
use crate::llm::{Completion, CompletionRequest, LlmBackend, Role, TokenUsage};

/// Network-free backend that answers after a fixed latency.
///
/// The answer names the persona and the task so the demos produce readable
/// output without an API key.
pub struct OfflineBackend {
    latency: Duration,
}

impl OfflineBackend {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn first_line(text: &str) -> &str {
        text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
    }

    fn word_count(text: &str) -> u64 {
        text.split_whitespace().count() as u64
    }
}

#[async_trait]
impl LlmBackend for OfflineBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let task = request
            .content_of(Role::User)
            .ok_or_else(|| OrchestrationError::LlmError("request has no user message".to_string()))?;
        let persona = request.content_of(Role::System).unwrap_or("");

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        let content = format!(
            "{}\nResponse to: {}",
            Self::first_line(persona),
            Self::first_line(task)
        );

        let prompt_tokens = request
            .messages
            .iter()
            .map(|m| Self::word_count(&m.content))
            .sum::<u64>();
        let completion_tokens = Self::word_count(&content);
        debug!("Offline completion with {} prompt tokens", prompt_tokens);

        Ok(Completion {
            content,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    fn name(&self) -> String {
        format!("offline ({}ms)", self.latency.as_millis())
    }
}
