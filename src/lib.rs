pub mod agents;
pub mod config;
pub mod crew;
pub mod crews;
pub mod error;
pub mod events;
pub mod flow;
pub mod flows;
pub mod llm;
pub mod patterns;
pub mod runtime;

#[cfg(test)]
mod test_support;

pub use agents::Agent;
pub use config::Config;
pub use crew::{Crew, CrewOutput, Task};
pub use error::{OrchestrationError, Result};
pub use flow::{and_, or_, Flow};
pub use llm::LlmBackend;
pub use patterns::Patterns;
