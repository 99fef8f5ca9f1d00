use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::crew::inputs::{interpolate, Inputs};
use crate::crew::task::{Task, TaskOutput};
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmBackend, Message, TokenUsage};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_completed: u64,
    pub error_count: u32,
    pub usage: TokenUsage,
    #[serde(with = "humantime_serde")]
    pub busy_time: Duration,
}

/// An LLM persona that carries out tasks
pub struct Agent {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub verbose: bool,
    llm: Arc<dyn LlmBackend>,
    metrics: Arc<RwLock<AgentMetrics>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("verbose", &self.verbose)
            .field("llm", &self.llm.name())
            .finish()
    }
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Arc<dyn LlmBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            verbose: false,
            llm,
            metrics: Arc::new(RwLock::new(AgentMetrics::default())),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &AgentConfig, llm: Arc<dyn LlmBackend>) -> Self {
        Self::new(
            name,
            config.role.clone(),
            config.goal.clone(),
            config.backstory.clone(),
            llm,
        )
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// System prompt for this agent with inputs applied
    pub fn persona(&self, inputs: &Inputs) -> Result<String> {
        let role = interpolate(&self.role, inputs)?;
        let goal = interpolate(&self.goal, inputs)?;
        let backstory = interpolate(&self.backstory, inputs)?;
        Ok(format!(
            "You are {}. {}\nYour personal goal is: {}",
            role.trim(),
            backstory.trim(),
            goal.trim()
        ))
    }

    fn task_prompt(task: &Task, context: Option<&str>) -> String {
        let mut prompt = format!(
            "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            task.description.trim(),
            task.expected_output.trim()
        );
        if let Some(context) = context {
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(context);
        }
        prompt
    }

    pub async fn execute_task(&self, task: &Task, inputs: &Inputs, context: Option<&str>) -> Result<TaskOutput> {
        let task = task.interpolated(inputs)?;
        let role = interpolate(&self.role, inputs)?;
        let persona = self.persona(inputs)?;
        let prompt = Self::task_prompt(&task, context);

        if self.verbose {
            info!("Agent '{}' working on task '{}'\n{}", role, task.name, prompt);
        } else {
            debug!("Agent '{}' working on task '{}'", role, task.name);
        }

        let started = Instant::now();
        let request = CompletionRequest::new(vec![Message::system(persona), Message::user(prompt)]);
        let completion = match self.llm.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Agent '{}' failed task '{}': {}", role, task.name, e);
                self.metrics.write().await.error_count += 1;
                return Err(e);
            }
        };
        let duration = started.elapsed();

        {
            let mut metrics = self.metrics.write().await;
            metrics.tasks_completed += 1;
            metrics.usage += completion.usage;
            metrics.busy_time += duration;
        }

        if self.verbose {
            info!("Agent '{}' final answer for '{}':\n{}", role, task.name, completion.content);
        } else {
            debug!("Agent '{}' finished task '{}' in {:?}", role, task.name, duration);
        }

        Ok(TaskOutput {
            name: task.name,
            description: task.description,
            agent: role,
            raw: completion.content,
            usage: completion.usage,
            duration,
        })
    }

    pub async fn get_metrics(&self) -> AgentMetrics {
        self.metrics.read().await.clone()
    }
}
