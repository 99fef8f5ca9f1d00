//! The demonstration flows built from the bundled crews.

pub mod parallel_listen_flow;
pub mod parallel_start_flow;

use std::sync::Arc;

use crate::llm::LlmBackend;

pub use parallel_listen_flow::{parallel_listen_flow, ParallelListenState};
pub use parallel_start_flow::{parallel_start_flow, ParallelStartState};

/// What every flow method needs to assemble its crew
#[derive(Clone)]
pub struct FlowSetup {
    pub llm: Arc<dyn LlmBackend>,
    pub current_year: String,
    pub verbose: bool,
}

impl FlowSetup {
    pub fn new(llm: Arc<dyn LlmBackend>, current_year: impl Into<String>) -> Self {
        Self {
            llm,
            current_year: current_year.into(),
            verbose: true,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
