use serde::Serialize;
use tracing::info;

use crate::crew::inputs;
use crate::crews::{single_task_crew, ContentCrew, ResearchCrew};
use crate::error::Result;
use crate::flow::{and_, Flow, FlowContext};
use crate::flows::FlowSetup;

pub const FLOW_NAME: &str = "parallel_listen_flow";

const CONTENT_TOPIC: &str = "AI in Marketing";
const INDUSTRY_TOPIC: &str = "Artificial Intelligence";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParallelListenState {
    pub market_research_result: String,
    pub competitor_analysis_result: String,
    pub content_feedback_result: String,
    pub combined_output: String,
}

/// One start method fanning out to three listeners that are joined again.
pub fn parallel_listen_flow(setup: FlowSetup) -> Result<Flow<ParallelListenState>> {
    let (market, competitors, feedback) = (setup.clone(), setup.clone(), setup);

    Flow::<ParallelListenState>::builder(FLOW_NAME)
        .description("Triggers research and content crew tasks in parallel once an initial task is done.")
        .start("initial_task", initial_task)
        .listen("analyze_market", "initial_task", move |ctx| {
            analyze_market(market.clone(), ctx)
        })
        .listen("analyze_competitors", "initial_task", move |ctx| {
            analyze_competitors(competitors.clone(), ctx)
        })
        .listen("analyze_feedback", "initial_task", move |ctx| {
            analyze_feedback(feedback.clone(), ctx)
        })
        .listen(
            "combine_results",
            and_(["analyze_market", "analyze_competitors", "analyze_feedback"]),
            combine_results,
        )
        .build()
}

async fn initial_task(_ctx: FlowContext<ParallelListenState>) -> Result<String> {
    info!("Initial task completed");
    Ok("Initial task completed".to_string())
}

async fn analyze_market(setup: FlowSetup, ctx: FlowContext<ParallelListenState>) -> Result<String> {
    info!("Starting market research task");
    let content = ContentCrew::new(setup.llm)?.with_verbose(setup.verbose);
    let crew = single_task_crew(
        "market_research",
        content.market_researcher()?,
        content.research_market()?,
        setup.verbose,
    )?;
    let output = crew
        .kickoff_async(&inputs([
            ("content_topic", CONTENT_TOPIC),
            ("current_year", setup.current_year.as_str()),
        ]))
        .await?;

    let raw = output.raw;
    ctx.update(|s| s.market_research_result = raw.clone()).await;
    info!("Market research task completed");
    Ok(raw)
}

async fn analyze_competitors(setup: FlowSetup, ctx: FlowContext<ParallelListenState>) -> Result<String> {
    info!("Starting competitor analysis task");
    let research = ResearchCrew::new(setup.llm)?.with_verbose(setup.verbose);
    let crew = single_task_crew(
        "competitor_analysis",
        research.competitor_analyst()?,
        research.analyze_competitors()?,
        setup.verbose,
    )?;
    let output = crew
        .kickoff_async(&inputs([
            ("industry_topic", INDUSTRY_TOPIC),
            ("current_year", setup.current_year.as_str()),
        ]))
        .await?;

    let raw = output.raw;
    ctx.update(|s| s.competitor_analysis_result = raw.clone()).await;
    info!("Competitor analysis task completed");
    Ok(raw)
}

async fn analyze_feedback(setup: FlowSetup, ctx: FlowContext<ParallelListenState>) -> Result<String> {
    info!("Starting feedback analysis task");
    let content = ContentCrew::new(setup.llm)?.with_verbose(setup.verbose);
    let crew = single_task_crew(
        "feedback_analysis",
        content.feedback_analyst()?,
        content.analyze_feedback()?,
        setup.verbose,
    )?;
    let output = crew
        .kickoff_async(&inputs([
            ("content_topic", CONTENT_TOPIC),
            ("current_year", setup.current_year.as_str()),
        ]))
        .await?;

    let raw = output.raw;
    ctx.update(|s| s.content_feedback_result = raw.clone()).await;
    info!("Feedback analysis task completed");
    Ok(raw)
}

async fn combine_results(ctx: FlowContext<ParallelListenState>) -> Result<String> {
    let combined = ctx
        .update(|s| {
            s.combined_output = format!(
                "Market Research Result:\n{}\n\nCompetitor Analysis Result:\n{}\n\nContent Feedback Analysis Result:\n{}",
                s.market_research_result, s.competitor_analysis_result, s.content_feedback_result
            );
            s.combined_output.clone()
        })
        .await;
    info!("Combined results from all branches");
    Ok(combined)
}
