//! Backends shared by unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{OrchestrationError, Result};
use crate::llm::{Completion, CompletionRequest, LlmBackend, Role, TokenUsage};

/// Records every request and how many were in flight at once.
pub struct ScriptedBackend {
    latency: Duration,
    slow: Vec<(String, Duration)>,
    fail_on: Option<String>,
    panic_on: Option<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            slow: Vec::new(),
            fail_on: None,
            panic_on: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Use `latency` for prompts containing `marker`
    pub fn with_latency_for(mut self, marker: &str, latency: Duration) -> Self {
        self.slow.push((marker.to_string(), latency));
        self
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.to_string());
        self
    }

    pub fn panicking_on(mut self, marker: &str) -> Self {
        self.panic_on = Some(marker.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The prompt whose first line contains `marker`
    pub fn prompt_for(&self, marker: &str) -> Option<String> {
        self.prompts()
            .into_iter()
            .find(|p| p.lines().next().unwrap_or_default().contains(marker))
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let prompt = request.content_of(Role::User).unwrap_or_default().to_string();
        self.prompts.lock().unwrap().push(prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self
            .slow
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, latency)| *latency)
            .unwrap_or(self.latency);
        tokio::time::sleep(latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(ref marker) = self.panic_on {
            if prompt.contains(marker.as_str()) {
                panic!("scripted panic on {}", marker);
            }
        }
        if let Some(ref marker) = self.fail_on {
            if prompt.contains(marker.as_str()) {
                return Err(OrchestrationError::LlmError(format!("scripted failure on {}", marker)).into());
            }
        }

        let first_line = prompt.lines().next().unwrap_or_default();
        let task = first_line.trim_start_matches("Current Task: ");
        Ok(Completion {
            content: format!("answer to: {}", task),
            usage: TokenUsage { prompt_tokens: 3, completion_tokens: 2, total_tokens: 5 },
        })
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}
