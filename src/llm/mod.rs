pub mod offline;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::sync::Arc;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::Result;

pub use offline::OfflineBackend;
pub use openai::OpenAiBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Content of the first message with the given role
    pub fn content_of(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// The model provider every agent talks to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
    fn name(&self) -> String;
}

pub fn backend_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmBackend>> {
    let backend: Arc<dyn LlmBackend> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiBackend::from_config(config)?),
        LlmProvider::Offline => Arc::new(OfflineBackend::new(config.offline_latency)),
    };
    tracing::info!("Using LLM backend {}", backend.name());
    Ok(backend)
}
