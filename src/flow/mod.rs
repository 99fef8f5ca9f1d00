//! Event-driven flows.
//!
//! A flow is a set of named async methods over a shared state. Start methods
//! run together as soon as the flow is kicked off; a listener runs once its
//! [`Trigger`] is satisfied by the methods completed so far. Listeners whose
//! triggers become satisfied at the same moment run concurrently.

#[allow(clippy::module_inception)]
pub mod flow;
pub mod plot;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use flow::{Flow, FlowBuilder, FlowContext, FlowMethod, MethodKind};
pub use trigger::{and_, or_, Trigger};
