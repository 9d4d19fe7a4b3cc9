//! Persistence seams for workflows and execution records.
//!
//! The executor only needs to read workflow definitions and to create and
//! finish log records. `InMemoryStore` implements both traits for tests and
//! embedded use; the worker binary provides Postgres implementations.

use crate::definition::Workflow;
use crate::error::StoreError;
use crate::execution::WorkflowLog;
use async_trait::async_trait;
use paperbridge_core::{WorkflowId, WorkflowLogId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Read access to workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a workflow with its triggers and actions.
    async fn get_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    /// Loads every enabled workflow.
    async fn list_enabled_workflows(&self) -> Result<Vec<Workflow>, StoreError>;
}

/// Storage for execution records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persists a new `running` record.
    async fn create_log(&self, log: &WorkflowLog) -> Result<(), StoreError>;

    /// Loads a record.
    async fn get_log(&self, id: WorkflowLogId) -> Result<Option<WorkflowLog>, StoreError>;

    /// Writes the terminal status, output, error, and finish time of a record.
    ///
    /// Fails with `AlreadyFinished` if the stored record is already terminal.
    async fn finish_log(&self, log: &WorkflowLog) -> Result<(), StoreError>;
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
    logs: RwLock<HashMap<WorkflowLogId, WorkflowLog>>,
}

fn poisoned() -> StoreError {
    StoreError::Backend {
        reason: "lock poisoned".to_string(),
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a workflow.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store lock is poisoned.
    pub fn save_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .map_err(|_| poisoned())?
            .insert(workflow.id, workflow);
        Ok(())
    }

    /// Removes a workflow. Existing log records are kept.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store lock is poisoned.
    pub fn delete_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.write().map_err(|_| poisoned())?.remove(&id))
    }

    /// Every record for `workflow_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store lock is poisoned.
    pub fn logs_for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<WorkflowLog>, StoreError> {
        let logs = self.logs.read().map_err(|_| poisoned())?;
        let mut matching: Vec<WorkflowLog> = logs
            .values()
            .filter(|log| log.workflow_id == workflow_id)
            .cloned()
            .collect();
        matching.sort_by_key(|log| (log.executed_at, log.id.to_string()));
        Ok(matching)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn get_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn list_enabled_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read().map_err(|_| poisoned())?;
        let mut enabled: Vec<Workflow> = workflows.values().filter(|w| w.enabled).cloned().collect();
        enabled.sort_by_key(|w| (w.created_at, w.id.to_string()));
        Ok(enabled)
    }
}

#[async_trait]
impl LogStore for InMemoryStore {
    async fn create_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        self.logs
            .write()
            .map_err(|_| poisoned())?
            .insert(log.id, log.clone());
        Ok(())
    }

    async fn get_log(&self, id: WorkflowLogId) -> Result<Option<WorkflowLog>, StoreError> {
        Ok(self.logs.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn finish_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        let mut logs = self.logs.write().map_err(|_| poisoned())?;
        let stored = logs.get_mut(&log.id).ok_or_else(|| StoreError::NotFound {
            entity: "workflow log",
            id: log.id.to_string(),
        })?;
        if stored.status.is_terminal() {
            return Err(StoreError::AlreadyFinished { log_id: log.id });
        }
        stored.status = log.status;
        stored.output_data = log.output_data.clone();
        stored.error_message = log.error_message.clone();
        stored.finished_at = log.finished_at;
        Ok(())
    }
}
