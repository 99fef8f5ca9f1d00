use std::sync::Arc;

use crate::agents::Agent;
use crate::crew::{Crew, Process, Task};
use crate::crews::CrewDefinition;
use crate::error::Result;
use crate::llm::LlmBackend;

const AGENTS: &str = include_str!("config/agents.toml");
const TASKS: &str = include_str!("config/tasks.toml");

/// Industry trend and competitor research. Inputs: `industry_topic`, `current_year`.
pub struct ResearchCrew {
    definition: CrewDefinition,
    llm: Arc<dyn LlmBackend>,
    verbose: bool,
}

impl ResearchCrew {
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

    pub fn trend_analyst(&self) -> Result<Agent> {
        self.definition.agent("trend_analyst", self.llm.clone(), self.verbose)
    }

    pub fn competitor_analyst(&self) -> Result<Agent> {
        self.definition.agent("competitor_analyst", self.llm.clone(), self.verbose)
    }

    pub fn analyze_trends(&self) -> Result<Task> {
        self.definition.task("analyze_trends")
    }

    pub fn analyze_competitors(&self) -> Result<Task> {
        self.definition.task("analyze_competitors")
    }

    pub fn crew(&self) -> Result<Crew> {
        Crew::builder("research_crew")
            .agents([self.trend_analyst()?, self.competitor_analyst()?])
            .tasks([self.analyze_trends()?, self.analyze_competitors()?])
            .process(Process::Sequential)
            .verbose(self.verbose)
            .build()
    }
}
