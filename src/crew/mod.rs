//! Crews: agents working through an ordered task list.
//!
//! Tasks flagged `async_execution` are started and left running while the
//! crew moves on; the next synchronous task waits for all of them and sees
//! their outputs as context. That is the whole scheduling model.

#[allow(clippy::module_inception)]
pub mod crew;
pub mod inputs;
pub mod task;


pub use crew::{Crew, CrewBuilder, CrewOutput, Process, CONTEXT_DIVIDER};
pub use inputs::{inputs, interpolate, Inputs};
pub use task::{Task, TaskConfig, TaskOutput};
