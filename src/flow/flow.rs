use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::error::{OrchestrationError, Result};
use crate::events::{EventBus, ExecutionEvent};
use crate::flow::trigger::Trigger;
use crate::runtime::catch_panic;

type Handler<S> = Arc<dyn Fn(FlowContext<S>) -> BoxFuture<'static, Result<String>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodKind {
    Start,
    Listen(Trigger),
    /// Listener whose output names a route that other methods can listen to
    Router(Trigger),
}

pub struct FlowMethod<S> {
    pub name: String,
    pub kind: MethodKind,
    handler: Handler<S>,
}

impl<S> FlowMethod<S> {
    pub fn trigger(&self) -> Option<&Trigger> {
        match &self.kind {
            MethodKind::Start => None,
            MethodKind::Listen(trigger) | MethodKind::Router(trigger) => Some(trigger),
        }
    }

    pub fn is_router(&self) -> bool {
        matches!(self.kind, MethodKind::Router(_))
    }
}

/// Handle passed to every flow method
pub struct FlowContext<S> {
    flow_id: Uuid,
    method: String,
    trigger_output: Option<String>,
    state: Arc<RwLock<S>>,
}

impl<S> Clone for FlowContext<S> {
    fn clone(&self) -> Self {
        Self {
            flow_id: self.flow_id,
            method: self.method.clone(),
            trigger_output: self.trigger_output.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S> FlowContext<S> {
    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Output of the method (or route label) that fired this one
    pub fn trigger_output(&self) -> Option<&str> {
        self.trigger_output.as_deref()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }
}

pub struct FlowBuilder<S> {
    name: String,
    description: String,
    methods: Vec<FlowMethod<S>>,
    events: Option<EventBus>,
}

impl<S> FlowBuilder<S>
where
    S: Default + Clone + Send + Sync + 'static,
{
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn push<F, Fut>(mut self, name: impl Into<String>, kind: MethodKind, handler: F) -> Self
    where
        F: Fn(FlowContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let handler: Handler<S> = Arc::new(move |ctx| handler(ctx).boxed());
        self.methods.push(FlowMethod {
            name: name.into(),
            kind,
            handler,
        });
        self
    }

    pub fn start<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(FlowContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.push(name, MethodKind::Start, handler)
    }

    pub fn listen<F, Fut>(self, name: impl Into<String>, trigger: impl Into<Trigger>, handler: F) -> Self
    where
        F: Fn(FlowContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.push(name, MethodKind::Listen(trigger.into()), handler)
    }

    pub fn router<F, Fut>(self, name: impl Into<String>, trigger: impl Into<Trigger>, handler: F) -> Self
    where
        F: Fn(FlowContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.push(name, MethodKind::Router(trigger.into()), handler)
    }

    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<Flow<S>> {
        let invalid = |msg: String| -> Box<dyn std::error::Error + Send + Sync> {
            OrchestrationError::InvalidFlow(format!("{}: {}", self.name, msg)).into()
        };

        if !self.methods.iter().any(|m| m.kind == MethodKind::Start) {
            return Err(invalid("a flow needs at least one start method".to_string()));
        }

        let mut names = HashSet::new();
        for method in &self.methods {
            if !names.insert(method.name.as_str()) {
                return Err(invalid(format!("duplicate method '{}'", method.name)));
            }
        }

        // unknown names can only be route labels, so they need a router
        let has_router = self.methods.iter().any(FlowMethod::is_router);
        for method in &self.methods {
            if let Some(trigger) = method.trigger() {
                if trigger.names().is_empty() {
                    return Err(invalid(format!("method '{}' has an empty trigger", method.name)));
                }
                for name in trigger.names() {
                    if !has_router && !names.contains(name) {
                        return Err(invalid(format!(
                            "method '{}' listens to unknown method '{}'",
                            method.name, name
                        )));
                    }
                }
            }
        }

        Ok(Flow {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            methods: self.methods,
            state: Arc::new(RwLock::new(S::default())),
            events: self.events.unwrap_or_default(),
        })
    }
}

/// A graph of methods sharing one typed state
pub struct Flow<S> {
    id: Uuid,
    name: String,
    description: String,
    methods: Vec<FlowMethod<S>>,
    state: Arc<RwLock<S>>,
    events: EventBus,
}

impl<S> Flow<S>
where
    S: Default + Clone + Send + Sync + 'static,
{
    pub fn builder(name: impl Into<String>) -> FlowBuilder<S> {
        FlowBuilder {
            name: name.into(),
            description: String::new(),
            methods: Vec::new(),
            events: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn methods(&self) -> &[FlowMethod<S>] {
        &self.methods
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> S {
        self.state.read().await.clone()
    }

    pub async fn reset_state(&self) {
        *self.state.write().await = S::default();
    }

    /// Run the flow until no method is left to fire; returns the last output
    pub async fn kickoff_async(&self) -> Result<String> {
        let span = tracing::info_span!("flow", flow = %self.name, flow_id = %self.id);
        self.execute().instrument(span).await
    }

    /// Blocking variant of [`Flow::kickoff_async`]
    pub fn kickoff(&self) -> Result<String> {
        crate::runtime::block_on(self.kickoff_async())?
    }

    fn spawn_method(
        &self,
        running: &mut JoinSet<(usize, Result<String>)>,
        index: usize,
        trigger_output: Option<String>,
    ) {
        let method = &self.methods[index];
        let ctx = FlowContext {
            flow_id: self.id,
            method: method.name.clone(),
            trigger_output,
            state: self.state.clone(),
        };
        let handler = method.handler.clone();

        debug!("Starting flow method '{}'", method.name);
        self.events.emit(ExecutionEvent::MethodStarted {
            flow_id: self.id,
            flow: self.name.clone(),
            method: method.name.clone(),
        });
        running.spawn(async move { (index, catch_panic(handler(ctx)).await) }.in_current_span());
    }

    async fn execute(&self) -> Result<String> {
        info!("Flow '{}' starting", self.name);
        self.events.emit(ExecutionEvent::FlowStarted {
            flow_id: self.id,
            flow: self.name.clone(),
        });

        let mut running = JoinSet::new();
        let mut completed: HashSet<String> = HashSet::new();
        let mut fired: HashSet<usize> = HashSet::new();
        let mut last_output: Option<String> = None;

        for (index, method) in self.methods.iter().enumerate() {
            if method.kind == MethodKind::Start {
                fired.insert(index);
                self.spawn_method(&mut running, index, None);
            }
        }

        while let Some(joined) = running.join_next().await {
            let (index, result) = joined
                .map_err(|e| OrchestrationError::RuntimeError(format!("Flow method panicked: {}", e)))?;
            let method = &self.methods[index];

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    error!("Flow method '{}' failed: {}", method.name, e);
                    self.events.emit(ExecutionEvent::MethodFailed {
                        flow_id: self.id,
                        flow: self.name.clone(),
                        method: method.name.clone(),
                        error: e.to_string(),
                    });
                    running.abort_all();
                    return Err(OrchestrationError::FlowMethodFailed(format!("{}: {}", method.name, e)).into());
                }
            };

            self.events.emit(ExecutionEvent::MethodCompleted {
                flow_id: self.id,
                flow: self.name.clone(),
                method: method.name.clone(),
            });
            completed.insert(method.name.clone());

            if method.is_router() {
                info!("Router '{}' chose route '{}'", method.name, output);
                completed.insert(output.clone());
            } else {
                last_output = Some(output.clone());
            }

            for (candidate, listener) in self.methods.iter().enumerate() {
                if fired.contains(&candidate) {
                    continue;
                }
                if let Some(trigger) = listener.trigger() {
                    if trigger.is_satisfied(&completed) {
                        debug!("'{}' fired by {}", listener.name, trigger);
                        fired.insert(candidate);
                        self.spawn_method(&mut running, candidate, Some(output.clone()));
                    }
                }
            }
        }

        info!("Flow '{}' finished", self.name);
        self.events.emit(ExecutionEvent::FlowCompleted {
            flow_id: self.id,
            flow: self.name.clone(),
        });

        last_output.ok_or_else(|| {
            OrchestrationError::InvalidFlow(format!("{}: no method produced an output", self.name)).into()
        })
    }
}
