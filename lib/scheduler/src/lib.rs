//! Scheduling and routing for paperbridge workflows.
//!
//! This crate provides:
//!
//! - **Sweep**: periodic execution of every workflow with a schedule trigger
//! - **Event Router**: dispatching inbound service events to listening workflows

pub mod error;
pub mod router;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use error::SchedulerError;
pub use router::DispatchOutcome;
pub use sweep::{Scheduler, SweepSummary};
