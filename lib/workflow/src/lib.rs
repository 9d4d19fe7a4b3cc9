//! Workflow engine for paperbridge.
//!
//! This crate provides the workflow execution engine, including:
//!
//! - **Model**: workflows with ordered triggers and actions
//! - **Conditions**: nested `all`/`any` trees evaluated against event payloads
//! - **Triggers**: matching inbound events to workflows
//! - **Actions**: dispatching action types to Paperless-ngx and Lexoffice
//! - **Execution**: running a workflow and recording the outcome in a log
//! - **Stores**: persistence traits and an in-memory implementation

pub mod action;
pub mod condition;
pub mod context;
pub mod definition;
pub mod error;
pub mod event;
pub mod execution;
pub mod executor;
pub mod store;
pub mod trigger;

#[cfg(test)]
mod fakes;

pub use action::{Action, ActionKind, ActionRunner, ActionTarget};
pub use context::ExecutionContext;
pub use definition::Workflow;
pub use error::{ActionError, ExecutionError, ParseTagError, StoreError, WorkflowError};
pub use event::InboundEvent;
pub use execution::{ActionOutcome, LogStatus, SkipReason, WorkflowLog};
pub use executor::WorkflowExecutor;
pub use store::{InMemoryStore, LogStore, WorkflowStore};
pub use trigger::{Trigger, TriggerSource};
