//! The five concurrency patterns, run one after another.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::crew::{inputs, CrewOutput, Inputs};
use crate::crews::{ContentCrew, ResearchCrew};
use crate::error::{OrchestrationError, Result};
use crate::flows::{parallel_listen_flow, parallel_start_flow, FlowSetup};
use crate::llm::LlmBackend;

const RULER_WIDTH: usize = 50;

/// `writeln!` that reports io failures as `OrchestrationError`
macro_rules! emit {
    ($out:expr, $($arg:tt)*) => {
        writeln!($out, $($arg)*).map_err(OrchestrationError::from)?
    };
}

pub struct Patterns {
    llm: Arc<dyn LlmBackend>,
    current_year: String,
    verbose: bool,
}

impl Patterns {
    pub fn new(llm: Arc<dyn LlmBackend>, config: &Config) -> Self {
        Self {
            llm,
            current_year: config.demo.resolved_year(),
            verbose: config.crew.verbose,
        }
    }

    pub fn current_year(&self) -> &str {
        &self.current_year
    }

    fn flow_setup(&self) -> FlowSetup {
        FlowSetup::new(self.llm.clone(), self.current_year.clone()).with_verbose(self.verbose)
    }

    fn content_inputs(&self) -> Inputs {
        inputs([
            ("content_topic", "AI in Content Creation"),
            ("current_year", self.current_year.as_str()),
            ("target_audience", "Marketing professionals"),
            ("content_type", "blog post"),
            ("word_count", "500"),
        ])
    }

    fn research_inputs(&self) -> Inputs {
        inputs([
            ("industry_topic", "Artificial Intelligence"),
            ("current_year", self.current_year.as_str()),
        ])
    }

    /// Async tasks of one crew overlapping until the writing task joins them
    pub async fn run_parallel_tasks_in_content_crew(&self) -> Result<CrewOutput> {
        let crew = ContentCrew::new(self.llm.clone())?
            .with_verbose(self.verbose)
            .crew()?;
        crew.kickoff_async(&self.content_inputs()).await
    }

    /// Two whole crews gathered concurrently
    pub async fn run_parallel_execution_of_multiple_crews(&self) -> Result<(CrewOutput, CrewOutput)> {
        let content = ContentCrew::new(self.llm.clone())?
            .with_verbose(self.verbose)
            .crew()?;
        let research = ResearchCrew::new(self.llm.clone())?
            .with_verbose(self.verbose)
            .crew()?;
        let (content_inputs, research_inputs) = (self.content_inputs(), self.research_inputs());

        tokio::try_join!(
            content.kickoff_async(&content_inputs),
            research.kickoff_async(&research_inputs),
        )
    }

    pub async fn run_parallel_execution_with_start_flow(&self) -> Result<String> {
        parallel_start_flow(self.flow_setup())?.kickoff_async().await
    }

    pub async fn run_branching_with_listen_flow(&self) -> Result<String> {
        parallel_listen_flow(self.flow_setup())?.kickoff_async().await
    }

    /// Both flows gathered concurrently
    pub async fn run_parallel_execution_of_multiple_flows(&self) -> Result<(String, String)> {
        let start_flow = parallel_start_flow(self.flow_setup())?;
        let listen_flow = parallel_listen_flow(self.flow_setup())?;

        tokio::try_join!(start_flow.kickoff_async(), listen_flow.kickoff_async())
    }

    pub async fn run_all(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_all_to(&mut stdout).await
    }

    /// Run every pattern in order, printing each result to `out`
    pub async fn run_all_to<W: Write + Send>(&self, out: &mut W) -> Result<()> {
        let ruler = "-".repeat(RULER_WIDTH);
        emit!(out, "\n=== Concurrency and Branching with Crews and Flows ===\n");
        emit!(out, "Current Year: {}", self.current_year);

        emit!(out, "{}", ruler);
        emit!(out, "Step 1: Parallel Execution of Tasks in Content Crew");
        let output = self.run_parallel_tasks_in_content_crew().await?;
        emit!(out, "\nFinal Output from Content Crew:\n{}", output.raw);
        emit!(out, "{}\n", ruler);

        emit!(out, "{}", ruler);
        emit!(out, "Step 2: Parallel Execution of Multiple Crews");
        let (content, research) = self.run_parallel_execution_of_multiple_crews().await?;
        emit!(out, "\nContent Crew Result:\n{}", content.raw);
        emit!(out, "\nResearch Crew Result:\n{}", research.raw);
        emit!(out, "{}\n", ruler);

        emit!(out, "{}", ruler);
        emit!(out, "Step 3: Parallel Execution within Flows using start methods");
        let output = self.run_parallel_execution_with_start_flow().await?;
        emit!(out, "---- Final Output ----\n{}", output);
        emit!(out, "{}\n", ruler);

        emit!(out, "{}", ruler);
        emit!(out, "Step 4: Branching in a Flow using listeners");
        let output = self.run_branching_with_listen_flow().await?;
        emit!(out, "---- Final Output ----\n{}", output);
        emit!(out, "{}\n", ruler);

        emit!(out, "{}", ruler);
        emit!(out, "Step 5: Parallel Execution of Multiple Flows");
        let (start, listen) = self.run_parallel_execution_of_multiple_flows().await?;
        emit!(out, "\nParallel start flow result:\n{}", start);
        emit!(out, "\nParallel listen flow result:\n{}", listen);
        emit!(out, "{}\n", ruler);

        info!("All patterns finished");
        Ok(())
    }

    /// Write diagrams of both flows into `dir`
    pub fn plot_flows(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        Ok(vec![
            parallel_start_flow(self.flow_setup())?.plot(dir)?,
            parallel_listen_flow(self.flow_setup())?.plot(dir)?,
        ])
    }
}
