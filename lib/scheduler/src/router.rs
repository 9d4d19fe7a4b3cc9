//! Routing inbound events to the workflows listening for them.

use crate::error::SchedulerError;
use crate::sweep::Scheduler;
use paperbridge_core::{WorkflowId, WorkflowLogId};
use paperbridge_workflow::{InboundEvent, LogStatus};
use serde::Serialize;
use tracing::{error, info, instrument};

/// The result of running one workflow for a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub status: LogStatus,
    pub log_id: WorkflowLogId,
}

impl Scheduler {
    /// Executes every enabled workflow with a trigger for the event's source
    /// and event type, one after another.
    ///
    /// Each selected workflow still evaluates its own trigger conditions. A
    /// workflow whose execution record cannot be persisted is logged and left
    /// out of the outcomes.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowListing` if the candidate workflows cannot be loaded.
    #[instrument(skip(self, event), fields(source = %event.source, event_type = %event.event_type))]
    pub async fn dispatch_event(
        &self,
        event: &InboundEvent,
    ) -> paperbridge_core::Result<Vec<DispatchOutcome>, SchedulerError> {
        let listening: Vec<_> = self
            .workflows
            .list_enabled_workflows()
            .await
            .map_err(|e| SchedulerError::WorkflowListing {
                reason: e.to_string(),
            })?
            .into_iter()
            .filter(|w| w.listens_to(event.source, &event.event_type))
            .collect();

        let trigger_data = event.to_trigger_data();
        let mut outcomes = Vec::with_capacity(listening.len());
        for workflow in listening {
            match self
                .executor
                .execute_workflow(workflow.id, trigger_data.clone())
                .await
            {
                Ok(log) => outcomes.push(DispatchOutcome {
                    workflow_id: workflow.id,
                    workflow_name: workflow.name,
                    status: log.status,
                    log_id: log.id,
                }),
                Err(report) => {
                    error!(workflow_id = %workflow.id, error = %report, "Dispatch failed");
                }
            }
        }

        info!(workflows = outcomes.len(), "Dispatched event");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RejectingLogs, scheduler_with};
    use paperbridge_workflow::{InMemoryStore, LogStore, TriggerSource, Workflow};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn dispatches_to_listening_workflows_only() {
        let store = Arc::new(InMemoryStore::new());
        let created = Workflow::new("on create")
            .with_trigger(TriggerSource::Paperless, "document_created", None);
        let updated = Workflow::new("on update")
            .with_trigger(TriggerSource::Paperless, "document_updated", None);
        let lexoffice = Workflow::new("lexoffice")
            .with_trigger(TriggerSource::Lexoffice, "document_created", None);
        let disabled = Workflow::new("disabled")
            .with_enabled(false)
            .with_trigger(TriggerSource::Paperless, "document_created", None);
        for wf in [&created, &updated, &lexoffice, &disabled] {
            store.save_workflow(wf.clone()).unwrap();
        }

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&store) as Arc<dyn LogStore>);
        let event = InboundEvent::from_paperless(json!({"document_id": 42}));
        let outcomes = scheduler.dispatch_event(&event).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].workflow_id, created.id);
        assert_eq!(outcomes[0].workflow_name, "on create");
        assert_eq!(outcomes[0].status, LogStatus::Success);

        let log = store.get_log(outcomes[0].log_id).await.unwrap().unwrap();
        assert_eq!(log.input_data["document_id"], 42);
        assert_eq!(log.input_data["source"], "paperless");
    }

    #[tokio::test]
    async fn conditions_still_apply_after_routing() {
        let store = Arc::new(InMemoryStore::new());
        let invoices = Workflow::new("invoices only").with_trigger(
            TriggerSource::Paperless,
            "document_created",
            Some(json!({"field": "payload.document_type", "value": "invoice"})),
        );
        store.save_workflow(invoices.clone()).unwrap();

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&store) as Arc<dyn LogStore>);
        let event = InboundEvent::from_paperless(json!({"id": 1, "document_type": "receipt"}));
        let outcomes = scheduler.dispatch_event(&event).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, LogStatus::Skipped);
    }

    #[tokio::test]
    async fn persistence_failures_are_left_out() {
        let store = Arc::new(InMemoryStore::new());
        let rejected = Workflow::new("rejected")
            .with_trigger(TriggerSource::Lexoffice, "voucher.created", None);
        let accepted = Workflow::new("accepted")
            .with_trigger(TriggerSource::Lexoffice, "voucher.created", None);
        store.save_workflow(rejected.clone()).unwrap();
        store.save_workflow(accepted.clone()).unwrap();

        let logs = Arc::new(RejectingLogs::new(rejected.id));
        let scheduler = scheduler_with(Arc::clone(&store), logs as Arc<dyn LogStore>);
        let event = InboundEvent::from_lexoffice(json!({"eventType": "voucher.created"}));
        let outcomes = scheduler.dispatch_event(&event).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].workflow_id, accepted.id);
    }

    #[tokio::test]
    async fn no_listeners_means_no_outcomes() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&store) as Arc<dyn LogStore>);

        let outcomes = scheduler
            .dispatch_event(&InboundEvent::new(TriggerSource::Lexoffice, "contact.changed"))
            .await
            .unwrap();

        assert!(outcomes.is_empty());
    }
}
