//! Ready-made crews whose agents and tasks are described in bundled TOML.

pub mod content_crew;
pub mod research_crew;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agents::{Agent, AgentConfig};
use crate::crew::{Crew, Task, TaskConfig};
use crate::error::{OrchestrationError, Result};
use crate::llm::LlmBackend;

pub use content_crew::ContentCrew;
pub use research_crew::ResearchCrew;

/// Agent and task tables parsed from a crew's config files
#[derive(Debug, Clone)]
pub struct CrewDefinition {
    agents: BTreeMap<String, AgentConfig>,
    tasks: BTreeMap<String, TaskConfig>,
}

impl CrewDefinition {
    pub fn from_toml(agents: &str, tasks: &str) -> Result<Self> {
        let agents: BTreeMap<String, AgentConfig> = toml::from_str(agents)
            .map_err(|e| OrchestrationError::ConfigError(format!("Invalid agents config: {}", e)))?;
        let tasks: BTreeMap<String, TaskConfig> = toml::from_str(tasks)
            .map_err(|e| OrchestrationError::ConfigError(format!("Invalid tasks config: {}", e)))?;

        for (name, task) in &tasks {
            if !agents.contains_key(&task.agent) {
                return Err(OrchestrationError::ConfigError(format!(
                    "Task '{}' is assigned to unknown agent '{}'",
                    name, task.agent
                ))
                .into());
            }
        }

        Ok(Self { agents, tasks })
    }

    pub fn agent(&self, name: &str, llm: Arc<dyn LlmBackend>, verbose: bool) -> Result<Agent> {
        let config = self
            .agents
            .get(name)
            .ok_or_else(|| OrchestrationError::ConfigError(format!("No agent named '{}'", name)))?;
        Ok(Agent::from_config(name, config, llm).with_verbose(verbose))
    }

    pub fn task(&self, name: &str) -> Result<Task> {
        let config = self
            .tasks
            .get(name)
            .ok_or_else(|| OrchestrationError::ConfigError(format!("No task named '{}'", name)))?;
        Ok(Task::from_config(name, config))
    }
}

/// Crew of one agent running one task, used by the flows
pub fn single_task_crew(name: impl Into<String>, agent: Agent, task: Task, verbose: bool) -> Result<Crew> {
    Crew::builder(name).agent(agent).task(task).verbose(verbose).build()
}
