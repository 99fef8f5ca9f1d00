use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::crew::inputs::{interpolate, Inputs};
use crate::error::Result;
use crate::llm::TokenUsage;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
    pub agent: String,
}

/// A unit of work assigned to one named agent
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: String,
    pub async_execution: bool,
    /// Tasks whose outputs feed this one; `None` means every earlier output
    pub context: Option<Vec<String>>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            async_execution: false,
            context: None,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &TaskConfig) -> Self {
        Self::new(
            name,
            config.description.clone(),
            config.expected_output.clone(),
            config.agent.clone(),
        )
    }

    pub fn with_async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }

    pub fn with_context<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = Some(tasks.into_iter().map(Into::into).collect());
        self
    }

    /// Copy of this task with inputs substituted into its text
    pub fn interpolated(&self, inputs: &Inputs) -> Result<Task> {
        Ok(Task {
            description: interpolate(&self.description, inputs)?,
            expected_output: interpolate(&self.expected_output, inputs)?,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub name: String,
    pub description: String,
    /// Role of the agent that produced the output
    pub agent: String,
    pub raw: String,
    pub usage: TokenUsage,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}
