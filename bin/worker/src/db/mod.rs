//! Postgres repositories backing the workflow engine's stores.
//!
//! This module provides data access for:
//! - Workflows with their triggers and actions
//! - Workflow execution logs

pub mod workflow;
pub mod workflow_log;

pub use workflow::WorkflowRepository;
pub use workflow_log::WorkflowLogRepository;

use paperbridge_workflow::StoreError;

/// Builds a decode error for a column value that failed to parse.
fn decode_error(what: &str, value: &str, reason: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {what} '{value}': {reason}"),
    )))
}

/// Maps a database error onto the engine's store error.
fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Decode(inner) => StoreError::Decode {
            reason: inner.to_string(),
        },
        other => StoreError::Backend {
            reason: other.to_string(),
        },
    }
}
