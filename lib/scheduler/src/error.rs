//! Error types for the scheduler crate.
//!
//! Use `SchedulerError` as the rootcause context for sweep and dispatch
//! failures. Failures of individual workflow executions are logged and
//! counted, never raised.

use std::fmt;

/// High-level scheduler errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The candidate workflows could not be loaded.
    WorkflowListing { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowListing { reason } => {
                write!(f, "failed to list workflows: {reason}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}
