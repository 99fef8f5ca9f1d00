use std::sync::Arc;

use crate::agents::Agent;
use crate::crew::{Crew, Process, Task};
use crate::crews::CrewDefinition;
use crate::error::Result;
use crate::llm::LlmBackend;

const AGENTS: &str = include_str!("config/agents.toml");
const TASKS: &str = include_str!("config/tasks.toml");

/// Researches a topic, reads audience feedback and brainstorms in parallel,
/// then writes a piece from all three.
///
/// Inputs: `content_topic`, `current_year`, `target_audience`,
/// `content_type`, `word_count`.
pub struct ContentCrew {
    definition: CrewDefinition,
    llm: Arc<dyn LlmBackend>,
    verbose: bool,
}

impl ContentCrew {
    pub fn new(llm: Arc<dyn LlmBackend>) -> Result<Self> {
        Ok(Self {
            definition: CrewDefinition::from_toml(AGENTS, TASKS)?,
            llm,
            verbose: true,
        })
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn agent(&self, name: &str) -> Result<Agent> {
        self.definition.agent(name, self.llm.clone(), self.verbose)
    }

    pub fn market_researcher(&self) -> Result<Agent> {
        self.agent("market_researcher")
    }

    pub fn feedback_analyst(&self) -> Result<Agent> {
        self.agent("feedback_analyst")
    }

    pub fn idea_generator(&self) -> Result<Agent> {
        self.agent("idea_generator")
    }

    pub fn content_writer(&self) -> Result<Agent> {
        self.agent("content_writer")
    }

    pub fn research_market(&self) -> Result<Task> {
        Ok(self.definition.task("research_market")?.with_async_execution(true))
    }

    pub fn analyze_feedback(&self) -> Result<Task> {
        Ok(self.definition.task("analyze_feedback")?.with_async_execution(true))
    }

    pub fn generate_ideas(&self) -> Result<Task> {
        Ok(self.definition.task("generate_ideas")?.with_async_execution(true))
    }

    pub fn write_content(&self) -> Result<Task> {
        Ok(self
            .definition
            .task("write_content")?
            .with_context(["research_market", "analyze_feedback", "generate_ideas"]))
    }

    pub fn crew(&self) -> Result<Crew> {
        Crew::builder("content_crew")
            .agents([
                self.market_researcher()?,
                self.feedback_analyst()?,
                self.idea_generator()?,
                self.content_writer()?,
            ])
            .tasks([
                self.research_market()?,
                self.analyze_feedback()?,
                self.generate_ideas()?,
                self.write_content()?,
            ])
            .process(Process::Sequential)
            .verbose(self.verbose)
            .build()
    }
}
