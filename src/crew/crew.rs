use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, Instrument};

use crate::agents::Agent;
use crate::crew::inputs::Inputs;
use crate::crew::task::{Task, TaskOutput};
use crate::error::{OrchestrationError, Result};
use crate::events::{EventBus, ExecutionEvent};
use crate::llm::TokenUsage;
use crate::runtime::catch_panic;

/// Separator placed between task outputs handed to a later task as context
pub const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// Tasks run in declared order; async tasks overlap until a sync task needs them
    #[default]
    Sequential,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    /// Output of the last task
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub token_usage: TokenUsage,
}

impl std::fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

pub struct CrewBuilder {
    name: String,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    process: Process,
    verbose: bool,
    events: Option<EventBus>,
}

impl CrewBuilder {
    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<Crew> {
        let invalid = |msg: String| -> Box<dyn std::error::Error + Send + Sync> {
            OrchestrationError::InvalidCrew(format!("{}: {}", self.name, msg)).into()
        };

        if self.tasks.is_empty() {
            return Err(invalid("a crew needs at least one task".to_string()));
        }

        let mut agent_names = HashSet::new();
        for agent in &self.agents {
            if !agent_names.insert(agent.name.as_str()) {
                return Err(invalid(format!("duplicate agent '{}'", agent.name)));
            }
        }

        // walk tasks in order, tracking async tasks nothing has waited for yet
        let mut earlier = HashSet::new();
        let mut pending_async = HashSet::new();
        for task in &self.tasks {
            if !agent_names.contains(task.agent.as_str()) {
                return Err(invalid(format!(
                    "task '{}' is assigned to unknown agent '{}'",
                    task.name, task.agent
                )));
            }

            if let Some(ref context) = task.context {
                for dependency in context {
                    if !earlier.contains(dependency.as_str()) {
                        return Err(invalid(format!(
                            "task '{}' takes context from '{}', which is not an earlier task",
                            task.name, dependency
                        )));
                    }
                    if task.async_execution && pending_async.contains(dependency.as_str()) {
                        return Err(invalid(format!(
                            "async task '{}' cannot take context from async task '{}' that is still running",
                            task.name, dependency
                        )));
                    }
                }
            }

            if !earlier.insert(task.name.as_str()) {
                return Err(invalid(format!("duplicate task '{}'", task.name)));
            }

            if task.async_execution {
                pending_async.insert(task.name.as_str());
            } else {
                pending_async.clear();
            }
        }

        let trailing_async = self
            .tasks
            .iter()
            .rev()
            .take_while(|t| t.async_execution)
            .count();
        if trailing_async > 1 {
            return Err(invalid(format!(
                "a crew must end with at most one async task, found {}",
                trailing_async
            )));
        }

        Ok(Crew {
            name: self.name,
            agents: self.agents.into_iter().map(Arc::new).collect(),
            tasks: self.tasks,
            process: self.process,
            verbose: self.verbose,
            events: self.events.unwrap_or_default(),
        })
    }
}

/// A group of agents working through an ordered list of tasks
pub struct Crew {
    name: String,
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    process: Process,
    verbose: bool,
    events: EventBus,
}

impl Crew {
    pub fn builder(name: impl Into<String>) -> CrewBuilder {
        CrewBuilder {
            name: name.into(),
            agents: Vec::new(),
            tasks: Vec::new(),
            process: Process::default(),
            verbose: false,
            events: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    fn agent_for(&self, task: &Task) -> Result<Arc<Agent>> {
        self.agents
            .iter()
            .find(|a| a.name == task.agent)
            .cloned()
            .ok_or_else(|| {
                OrchestrationError::InvalidCrew(format!("no agent named '{}'", task.agent)).into()
            })
    }

    fn context_for(&self, task: &Task, outputs: &[Option<TaskOutput>]) -> Option<String> {
        let raws: Vec<&str> = match task.context {
            Some(ref names) => names
                .iter()
                .filter_map(|name| self.tasks.iter().position(|t| &t.name == name))
                .filter_map(|index| outputs[index].as_ref())
                .map(|output| output.raw.as_str())
                .collect(),
            None => outputs.iter().flatten().map(|output| output.raw.as_str()).collect(),
        };

        if raws.is_empty() {
            None
        } else {
            Some(raws.join(CONTEXT_DIVIDER))
        }
    }

    /// Check every template against `inputs` before any model is called
    fn validate_inputs(&self, inputs: &Inputs) -> Result<()> {
        for agent in &self.agents {
            agent.persona(inputs)?;
        }
        for task in &self.tasks {
            task.interpolated(inputs)?;
        }
        Ok(())
    }

    fn task_failed(task: &Task, error: Box<dyn std::error::Error + Send + Sync>) -> Box<dyn std::error::Error + Send + Sync> {
        OrchestrationError::TaskFailed(format!("{}: {}", task.name, error)).into()
    }

    async fn run_task(
        crew: String,
        events: EventBus,
        agent: Arc<Agent>,
        task: Task,
        inputs: Arc<Inputs>,
        context: Option<String>,
    ) -> Result<TaskOutput> {
        events.emit(ExecutionEvent::TaskStarted {
            crew: crew.clone(),
            task: task.name.clone(),
            agent: agent.name.clone(),
        });

        let output = catch_panic(agent.execute_task(&task, &inputs, context.as_deref()))
            .await
            .map_err(|e| Self::task_failed(&task, e))?;

        events.emit(ExecutionEvent::TaskCompleted {
            crew,
            task: task.name.clone(),
            agent: agent.name.clone(),
        });
        Ok(output)
    }

    /// Wait for every in-flight async task and record its output
    async fn drain_pending(
        pending: &mut JoinSet<(usize, Result<TaskOutput>)>,
        outputs: &mut [Option<TaskOutput>],
    ) -> Result<()> {
        while let Some(joined) = pending.join_next().await {
            let (index, result) = joined
                .map_err(|e| OrchestrationError::RuntimeError(format!("Async task panicked: {}", e)))?;
            match result {
                Ok(output) => outputs[index] = Some(output),
                Err(e) => {
                    pending.abort_all();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run the crew and wait for its final output
    pub async fn kickoff_async(&self, inputs: &Inputs) -> Result<CrewOutput> {
        let span = tracing::info_span!("crew", crew = %self.name);
        self.execute(inputs).instrument(span).await
    }

    /// Blocking variant of [`Crew::kickoff_async`]
    pub fn kickoff(&self, inputs: &Inputs) -> Result<CrewOutput> {
        crate::runtime::block_on(self.kickoff_async(inputs))?
    }

    async fn execute(&self, inputs: &Inputs) -> Result<CrewOutput> {
        self.validate_inputs(inputs)?;

        if self.verbose {
            info!("Crew '{}' starting {} tasks ({:?})", self.name, self.tasks.len(), self.process);
        } else {
            debug!("Crew '{}' starting {} tasks", self.name, self.tasks.len());
        }
        self.events.emit(ExecutionEvent::CrewStarted {
            crew: self.name.clone(),
            task_count: self.tasks.len(),
        });

        let inputs = Arc::new(inputs.clone());
        let mut outputs: Vec<Option<TaskOutput>> = vec![None; self.tasks.len()];
        let mut pending: JoinSet<(usize, Result<TaskOutput>)> = JoinSet::new();

        for (index, task) in self.tasks.iter().enumerate() {
            let agent = self.agent_for(task)?;

            if task.async_execution {
                let context = self.context_for(task, &outputs);
                let run = Self::run_task(
                    self.name.clone(),
                    self.events.clone(),
                    agent,
                    task.clone(),
                    inputs.clone(),
                    context,
                );
                debug!("Task '{}' running asynchronously", task.name);
                pending.spawn(async move { (index, run.await) }.in_current_span());
            } else {
                // a sync task sees everything started before it
                Self::drain_pending(&mut pending, &mut outputs).await?;
                let context = self.context_for(task, &outputs);
                let output = Self::run_task(
                    self.name.clone(),
                    self.events.clone(),
                    agent,
                    task.clone(),
                    inputs.clone(),
                    context,
                )
                .await?;
                outputs[index] = Some(output);
            }
        }

        Self::drain_pending(&mut pending, &mut outputs).await?;

        let tasks_output: Vec<TaskOutput> = outputs.into_iter().flatten().collect();
        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .unwrap_or_default();
        let mut token_usage = TokenUsage::default();
        for output in &tasks_output {
            token_usage += output.usage;
        }

        if self.verbose {
            info!("Crew '{}' finished, {} tokens used", self.name, token_usage.total_tokens);
        }
        self.events.emit(ExecutionEvent::CrewCompleted { crew: self.name.clone() });

        Ok(CrewOutput {
            raw,
            tasks_output,
            token_usage,
        })
    }
}
