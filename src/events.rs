use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Progress notifications published while crews and flows run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionEvent {
    CrewStarted {
        crew: String,
        task_count: usize,
    },
    TaskStarted {
        crew: String,
        task: String,
        agent: String,
    },
    TaskCompleted {
        crew: String,
        task: String,
        agent: String,
    },
    CrewCompleted {
        crew: String,
    },
    FlowStarted {
        flow_id: Uuid,
        flow: String,
    },
    MethodStarted {
        flow_id: Uuid,
        flow: String,
        method: String,
    },
    MethodCompleted {
        flow_id: Uuid,
        flow: String,
        method: String,
    },
    MethodFailed {
        flow_id: Uuid,
        flow: String,
        method: String,
        error: String,
    },
    FlowCompleted {
        flow_id: Uuid,
        flow: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: ExecutionEvent) {
        // no receivers is fine, events are best effort
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
