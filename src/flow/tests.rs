use std::time::Duration;
use tempfile::TempDir;

use crate::error::{OrchestrationError, Result};
use crate::events::ExecutionEvent;
use crate::flow::{and_, or_, Flow, FlowContext};

const LATENCY: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone)]
struct Trace {
    log: Vec<String>,
    seen: Vec<Option<String>>,
}

async fn step(ctx: FlowContext<Trace>, delay: Duration) -> Result<String> {
    tokio::time::sleep(delay).await;
    let name = ctx.method().to_string();
    let trigger = ctx.trigger_output().map(str::to_string);
    ctx.update(|s| {
        s.log.push(name.clone());
        s.seen.push(trigger);
    })
    .await;
    Ok(format!("{} done", name))
}

async fn summary(ctx: FlowContext<Trace>) -> Result<String> {
    let log = ctx.read(|s| s.log.clone()).await;
    Ok(log.join("+"))
}

async fn broken(_ctx: FlowContext<Trace>) -> Result<String> {
    tokio::time::sleep(LATENCY).await;
    Err(OrchestrationError::LlmError("backend went away".to_string()).into())
}

async fn explode(_ctx: FlowContext<Trace>) -> Result<String> {
    tokio::time::sleep(LATENCY).await;
    panic!("handler exploded");
}

async fn pick_high(_ctx: FlowContext<Trace>) -> Result<String> {
    Ok("high".to_string())
}

fn flow_error(result: Result<Flow<Trace>>) -> String {
    match result {
        Ok(_) => panic!("expected flow validation to fail"),
        Err(e) => {
            assert!(matches!(
                e.downcast_ref::<OrchestrationError>(),
                Some(OrchestrationError::InvalidFlow(_))
            ));
            e.to_string()
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_methods_run_concurrently() {
    let flow = Flow::<Trace>::builder("starts")
        .start("left", |ctx| step(ctx, LATENCY))
        .start("right", |ctx| step(ctx, LATENCY))
        .listen("join", and_(["left", "right"]), summary)
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let output = flow.kickoff_async().await.unwrap();

    assert!(started.elapsed() < LATENCY * 2, "took {:?}", started.elapsed());
    assert!(output == "left+right" || output == "right+left", "got {}", output);
}

#[tokio::test(start_paused = true)]
async fn test_listeners_on_one_method_run_concurrently() {
    let flow = Flow::<Trace>::builder("fan_out")
        .start("initial", |ctx| step(ctx, Duration::ZERO))
        .listen("one", "initial", |ctx| step(ctx, LATENCY))
        .listen("two", "initial", |ctx| step(ctx, LATENCY))
        .listen("three", "initial", |ctx| step(ctx, LATENCY))
        .listen("join", and_(["one", "two", "three"]), summary)
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    flow.kickoff_async().await.unwrap();
    assert!(started.elapsed() < LATENCY * 2, "took {:?}", started.elapsed());

    let state = flow.state().await;
    assert_eq!(state.log.len(), 4);
    assert_eq!(state.log[0], "initial");
    // every branch saw the start method's output
    assert!(state.seen[1..].iter().all(|s| s.as_deref() == Some("initial done")));
}

#[tokio::test(start_paused = true)]
async fn test_and_join_waits_for_slowest_branch_and_fires_once() {
    let flow = Flow::<Trace>::builder("join_once")
        .start("fast", |ctx| step(ctx, LATENCY))
        .start("slow", |ctx| step(ctx, LATENCY * 3))
        .listen("join", and_(["fast", "slow"]), |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();

    let output = flow.kickoff_async().await.unwrap();

    assert_eq!(output, "join done");
    let state = flow.state().await;
    assert_eq!(state.log, vec!["fast", "slow", "join"]);
    assert_eq!(state.seen[2].as_deref(), Some("slow done"));
}

#[tokio::test(start_paused = true)]
async fn test_or_fires_on_first_completion_only() {
    let flow = Flow::<Trace>::builder("either")
        .start("fast", |ctx| step(ctx, LATENCY))
        .start("slow", |ctx| step(ctx, LATENCY * 3))
        .listen("either", or_(["fast", "slow"]), |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();

    flow.kickoff_async().await.unwrap();

    let state = flow.state().await;
    assert_eq!(state.log, vec!["fast", "either", "slow"]);
    assert_eq!(state.seen[1].as_deref(), Some("fast done"));
}

#[tokio::test]
async fn test_router_selects_branch() {
    let flow = Flow::<Trace>::builder("routed")
        .start("measure", |ctx| step(ctx, Duration::ZERO))
        .router("route", "measure", pick_high)
        .listen("on_high", "high", |ctx| step(ctx, Duration::ZERO))
        .listen("on_low", "low", |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();

    let output = flow.kickoff_async().await.unwrap();

    assert_eq!(output, "on_high done");
    let state = flow.state().await;
    assert_eq!(state.log, vec!["measure", "on_high"]);
    assert_eq!(state.seen[1].as_deref(), Some("high"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_method_aborts_flow() {
    let flow = Flow::<Trace>::builder("failing")
        .start("ok", |ctx| step(ctx, LATENCY * 3))
        .start("bad", broken)
        .listen("after", and_(["ok", "bad"]), |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();
    let mut rx = flow.subscribe();

    let error = flow.kickoff_async().await.unwrap_err();

    match error.downcast_ref::<OrchestrationError>() {
        Some(OrchestrationError::FlowMethodFailed(msg)) => {
            assert!(msg.starts_with("bad: "));
            assert!(msg.contains("backend went away"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(flow.state().await.log.is_empty());

    let mut failed = false;
    while let Ok(event) = rx.try_recv() {
        if let ExecutionEvent::MethodFailed { method, .. } = event {
            assert_eq!(method, "bad");
            failed = true;
        }
    }
    assert!(failed);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_method_fails_like_an_error() {
    let flow = Flow::<Trace>::builder("panicking")
        .start("ok", |ctx| step(ctx, LATENCY * 3))
        .start("boom", explode)
        .listen("after", and_(["ok", "boom"]), |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();
    let mut rx = flow.subscribe();

    let error = flow.kickoff_async().await.unwrap_err();

    match error.downcast_ref::<OrchestrationError>() {
        Some(OrchestrationError::FlowMethodFailed(msg)) => {
            assert!(msg.starts_with("boom: "));
            assert!(msg.contains("handler exploded"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(flow.state().await.log.is_empty());

    let mut failed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ExecutionEvent::MethodFailed { method, error, .. } = event {
            failed.push((method, error));
        }
    }
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "boom");
    assert!(failed[0].1.contains("handler exploded"));
}

#[tokio::test]
async fn test_events_carry_flow_id() {
    let flow = Flow::<Trace>::builder("evented")
        .start("first", |ctx| step(ctx, Duration::ZERO))
        .listen("second", "first", |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();
    let mut rx = flow.subscribe();

    flow.kickoff_async().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let (flow_id, name) = (flow.id(), "evented".to_string());
    let method = |m: &str| m.to_string();
    assert_eq!(
        events,
        vec![
            ExecutionEvent::FlowStarted { flow_id, flow: name.clone() },
            ExecutionEvent::MethodStarted { flow_id, flow: name.clone(), method: method("first") },
            ExecutionEvent::MethodCompleted { flow_id, flow: name.clone(), method: method("first") },
            ExecutionEvent::MethodStarted { flow_id, flow: name.clone(), method: method("second") },
            ExecutionEvent::MethodCompleted { flow_id, flow: name.clone(), method: method("second") },
            ExecutionEvent::FlowCompleted { flow_id, flow: name },
        ]
    );
}

#[tokio::test]
async fn test_state_persists_until_reset() {
    let flow = Flow::<Trace>::builder("stateful")
        .start("only", |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();

    flow.kickoff_async().await.unwrap();
    flow.kickoff_async().await.unwrap();
    assert_eq!(flow.state().await.log.len(), 2);

    flow.reset_state().await;
    assert!(flow.state().await.log.is_empty());
}

#[test]
fn test_blocking_kickoff() {
    let flow = Flow::<Trace>::builder("blocking")
        .start("only", |ctx| step(ctx, Duration::from_millis(5)))
        .build()
        .unwrap();

    assert_eq!(flow.kickoff().unwrap(), "only done");
}

#[tokio::test]
async fn test_blocking_kickoff_inside_runtime_is_refused() {
    let flow = Flow::<Trace>::builder("nested")
        .start("only", |ctx| step(ctx, Duration::ZERO))
        .build()
        .unwrap();

    let error = flow.kickoff().unwrap_err();
    assert!(error.to_string().contains("kickoff_async"));
}

#[test]
fn test_validation_rejects_bad_graphs() {
    let message = flow_error(
        Flow::<Trace>::builder("no_start")
            .listen("orphan", "nothing", summary)
            .build(),
    );
    assert!(message.contains("at least one start method"));

    let message = flow_error(
        Flow::<Trace>::builder("dupes")
            .start("a", summary)
            .start("a", summary)
            .build(),
    );
    assert!(message.contains("duplicate method 'a'"));

    let message = flow_error(
        Flow::<Trace>::builder("typo")
            .start("a", summary)
            .listen("b", and_(["a", "c"]), summary)
            .build(),
    );
    assert!(message.contains("unknown method 'c'"));

    let message = flow_error(
        Flow::<Trace>::builder("empty_trigger")
            .start("a", summary)
            .listen("b", and_(Vec::<String>::new()), summary)
            .build(),
    );
    assert!(message.contains("empty trigger"));
}

#[test]
fn test_mermaid_and_plot() {
    let flow = Flow::<Trace>::builder("diagram")
        .description("two starts and a join")
        .start("left", summary)
        .start("right", summary)
        .listen("join", and_(["left", "right"]), summary)
        .router("route", "join", summary)
        .listen("done", "finished", summary)
        .build()
        .unwrap();

    let mermaid = flow.to_mermaid();
    assert!(mermaid.starts_with("flowchart TD\n"));
    assert!(mermaid.contains("    left([left])"));
    assert!(mermaid.contains("    join[join]"));
    assert!(mermaid.contains("    route{route}"));
    assert!(mermaid.contains("    left -->|AND| join"));
    assert!(mermaid.contains("    join --> route"));
    assert!(mermaid.contains("    route -.->|finished| done"));

    let dir = TempDir::new().unwrap();
    let path = flow.plot(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("diagram.md"));
    let doc = std::fs::read_to_string(path).unwrap();
    assert!(doc.starts_with("# diagram\n\ntwo starts and a join\n\n```mermaid\n"));
    assert!(doc.ends_with("```\n"));
}

#[test]
fn test_plot_into_a_file_path_reports_runtime_error() {
    let flow = Flow::<Trace>::builder("blocked")
        .start("only", summary)
        .build()
        .unwrap();

    let dir = TempDir::new().unwrap();
    let occupied = dir.path().join("not_a_dir");
    std::fs::write(&occupied, "taken").unwrap();

    let error = flow.plot(&occupied).unwrap_err();

    assert!(matches!(
        error.downcast_ref::<OrchestrationError>(),
        Some(OrchestrationError::RuntimeError(_))
    ));
}
