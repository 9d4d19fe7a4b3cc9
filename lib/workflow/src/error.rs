//! Error types for the workflow crate.
//!
//! Errors are layered:
//! - `ActionError`: one action failed; fatal to the run
//! - `StoreError`: the workflow or log store failed
//! - `ExecutionError`: why a run ended in `error`; its text becomes the log's error message
//! - `WorkflowError`: the executor could not persist the log itself (use as Report context)

use paperbridge_core::{WorkflowId, WorkflowLogId};
use paperbridge_integration::ConnectorError;
use std::fmt;

/// Failures raised while running a single action.
///
/// Missing identifiers are not errors: handlers report those in their result
/// map. Everything here aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action type has no handler.
    UnknownActionType { action_type: String },
    /// A connector operation failed; the message passes through unchanged.
    Connector(ConnectorError),
    /// A parameter is present but has the wrong shape.
    InvalidParameter { name: String, reason: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownActionType { action_type } => {
                write!(f, "Unknown action type: {action_type}")
            }
            Self::Connector(e) => write!(f, "{e}"),
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ConnectorError> for ActionError {
    fn from(e: ConnectorError) -> Self {
        Self::Connector(e)
    }
}

/// Errors from the workflow and log stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Record not found.
    NotFound { entity: &'static str, id: String },
    /// The log record already reached a terminal status.
    AlreadyFinished { log_id: WorkflowLogId },
    /// The backing store failed.
    Backend { reason: String },
    /// A stored value could not be decoded.
    Decode { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::AlreadyFinished { log_id } => {
                write!(f, "log {log_id} is already finished")
            }
            Self::Backend { reason } => write!(f, "store failure: {reason}"),
            Self::Decode { reason } => write!(f, "invalid stored value: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Why a run finished in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The workflow does not exist.
    WorkflowNotFound { workflow_id: WorkflowId },
    /// Loading the workflow failed.
    Store(StoreError),
    /// An action failed.
    Action(ActionError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "Workflow {workflow_id} not found")
            }
            Self::Store(e) => write!(f, "{e}"),
            Self::Action(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<StoreError> for ExecutionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ActionError> for ExecutionError {
    fn from(e: ActionError) -> Self {
        Self::Action(e)
    }
}

/// High-level workflow errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The execution record could not be written.
    LogPersistence { log_id: WorkflowLogId, reason: String },
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogPersistence { log_id, reason } => {
                write!(f, "failed to persist log {log_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for WorkflowError {}

/// A stored tag did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTagError {
    /// Which tag set was being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

impl fmt::Display for ParseTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseTagError {}
