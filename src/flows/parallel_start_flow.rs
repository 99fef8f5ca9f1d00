use serde::Serialize;
use tracing::info;

use crate::crew::inputs;
use crate::crews::{single_task_crew, ContentCrew, ResearchCrew};
use crate::error::Result;
use crate::flow::{and_, Flow, FlowContext};
use crate::flows::FlowSetup;

pub const FLOW_NAME: &str = "parallel_start_flow";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParallelStartState {
    pub content_crew_research_output: String,
    pub content_crew_ideas_output: String,
    pub research_crew_trends_output: String,
    pub research_crew_competitors_output: String,
}

/// Two start methods, each running a one-task crew, joined by `combine_results`.
pub fn parallel_start_flow(setup: FlowSetup) -> Result<Flow<ParallelStartState>> {
    let market = setup.clone();
    let trends = setup;

    Flow::<ParallelStartState>::builder(FLOW_NAME)
        .description("Runs tasks from the content and research crews in parallel.")
        .start("research_market_and_trends", move |ctx| {
            research_market_and_trends(market.clone(), ctx)
        })
        .start("brainstorm_ideas_and_analyze_competitors", move |ctx| {
            brainstorm_ideas_and_analyze_competitors(trends.clone(), ctx)
        })
        .listen(
            "combine_results",
            and_(["research_market_and_trends", "brainstorm_ideas_and_analyze_competitors"]),
            combine_results,
        )
        .build()
}

async fn research_market_and_trends(setup: FlowSetup, ctx: FlowContext<ParallelStartState>) -> Result<String> {
    info!("Starting market research task from the content crew");
    let content = ContentCrew::new(setup.llm)?.with_verbose(setup.verbose);
    let crew = single_task_crew(
        "market_research",
        content.market_researcher()?,
        content.research_market()?,
        setup.verbose,
    )?;

    let output = crew
        .kickoff_async(&inputs([
            ("content_topic", "AI in Content Creation"),
            ("current_year", setup.current_year.as_str()),
        ]))
        .await?;

    let raw = output.raw;
    ctx.update(|s| s.content_crew_research_output = raw.clone()).await;
    Ok(raw)
}

async fn brainstorm_ideas_and_analyze_competitors(
    setup: FlowSetup,
    ctx: FlowContext<ParallelStartState>,
) -> Result<String> {
    info!("Starting trend analysis task from the research crew");
    let research = ResearchCrew::new(setup.llm)?.with_verbose(setup.verbose);
    let crew = single_task_crew(
        "trend_analysis",
        research.trend_analyst()?,
        research.analyze_trends()?,
        setup.verbose,
    )?;

    let output = crew
        .kickoff_async(&inputs([
            ("industry_topic", "Artificial Intelligence"),
            ("current_year", setup.current_year.as_str()),
        ]))
        .await?;

    let raw = output.raw;
    ctx.update(|s| s.content_crew_ideas_output = raw.clone()).await;
    Ok(raw)
}

async fn combine_results(ctx: FlowContext<ParallelStartState>) -> Result<String> {
    let combined = ctx
        .read(|s| {
            format!(
                "Market Research: {}\nIdea Brainstorming: {}",
                s.content_crew_research_output, s.content_crew_ideas_output
            )
        })
        .await;
    info!("Combined results of both start methods");
    Ok(combined)
}
