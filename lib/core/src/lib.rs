//! Core types shared across the paperbridge crates.
//!
//! This crate provides the strongly-typed identifiers and the error-handling
//! foundation used by the integration, workflow, and scheduler crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ActionId, ParseIdError, TriggerId, WorkflowId, WorkflowLogId};
