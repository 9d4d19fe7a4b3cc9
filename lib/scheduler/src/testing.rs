//! Test doubles for the scheduler.

use crate::sweep::Scheduler;
use async_trait::async_trait;
use paperbridge_core::{WorkflowId, WorkflowLogId};
use paperbridge_integration::{
    AccountingService, ConnectorError, ConnectorProvider, DocumentService,
};
use paperbridge_workflow::{
    InMemoryStore, LogStore, StoreError, Workflow, WorkflowExecutor, WorkflowLog, WorkflowStore,
};
use std::sync::Arc;

/// A provider whose connectors can never be opened.
pub(crate) struct NoConnectors;

impl ConnectorProvider for NoConnectors {
    fn open_documents(&self) -> Result<Arc<dyn DocumentService>, ConnectorError> {
        Err(ConnectorError::InvalidConfig {
            reason: "no paperless in tests".to_string(),
        })
    }

    fn open_accounting(&self) -> Result<Arc<dyn AccountingService>, ConnectorError> {
        Err(ConnectorError::InvalidConfig {
            reason: "no lexoffice in tests".to_string(),
        })
    }
}

/// Log store that refuses records for one workflow.
pub(crate) struct RejectingLogs {
    inner: InMemoryStore,
    reject: WorkflowId,
}

impl RejectingLogs {
    pub fn new(reject: WorkflowId) -> Self {
        Self {
            inner: InMemoryStore::new(),
            reject,
        }
    }
}

#[async_trait]
impl LogStore for RejectingLogs {
    async fn create_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        if log.workflow_id == self.reject {
            return Err(StoreError::Backend {
                reason: "disk full".to_string(),
            });
        }
        self.inner.create_log(log).await
    }

    async fn get_log(&self, id: WorkflowLogId) -> Result<Option<WorkflowLog>, StoreError> {
        self.inner.get_log(id).await
    }

    async fn finish_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        self.inner.finish_log(log).await
    }
}

/// Workflow store whose listing always fails.
pub(crate) struct FailingListing;

#[async_trait]
impl WorkflowStore for FailingListing {
    async fn get_workflow(&self, _id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(None)
    }

    async fn list_enabled_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        Err(StoreError::Backend {
            reason: "connection refused".to_string(),
        })
    }
}

pub(crate) fn executor(
    workflows: Arc<dyn WorkflowStore>,
    logs: Arc<dyn LogStore>,
) -> WorkflowExecutor {
    WorkflowExecutor::new(workflows, logs, Arc::new(NoConnectors))
}

pub(crate) fn scheduler_with(store: Arc<InMemoryStore>, logs: Arc<dyn LogStore>) -> Scheduler {
    let workflows: Arc<dyn WorkflowStore> = store;
    Scheduler::new(Arc::clone(&workflows), executor(workflows, logs), 4)
}
