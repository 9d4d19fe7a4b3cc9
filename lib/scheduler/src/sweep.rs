//! The periodic sweep over scheduled workflows.

use crate::error::SchedulerError;
use futures::StreamExt;
use futures::stream;
use paperbridge_workflow::{
    InboundEvent, LogStatus, TriggerSource, WorkflowExecutor, WorkflowStore,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Workflows that were executed and produced a log record.
    pub executed: usize,
    /// Executions that ended in `success`.
    pub succeeded: usize,
    /// Executions that ended in `skipped`.
    pub skipped: usize,
    /// Executions that ended in `error`.
    pub errored: usize,
    /// Executions whose log record could not be persisted.
    pub failed: usize,
}

impl SweepSummary {
    fn record(&mut self, status: LogStatus) {
        self.executed += 1;
        match status {
            LogStatus::Success => self.succeeded += 1,
            LogStatus::Skipped => self.skipped += 1,
            LogStatus::Error => self.errored += 1,
            LogStatus::Running => {}
        }
    }
}

/// Starts workflow executions from the schedule and from inbound events.
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) workflows: Arc<dyn WorkflowStore>,
    pub(crate) executor: WorkflowExecutor,
    max_concurrency: usize,
}

impl Scheduler {
    /// Creates a scheduler running at most `max_concurrency` sweep executions
    /// at a time (minimum one).
    #[must_use]
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executor: WorkflowExecutor,
        max_concurrency: usize,
    ) -> Self {
        Self {
            workflows,
            executor,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Executes every enabled workflow that has a `schedule` trigger.
    ///
    /// Each workflow runs independently with the scheduled event; a failure
    /// in one is logged and counted and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowListing` if the candidate workflows cannot be loaded.
    #[instrument(skip(self))]
    pub async fn run_scheduled_workflows(
        &self,
    ) -> paperbridge_core::Result<SweepSummary, SchedulerError> {
        let candidates: Vec<_> = self
            .workflows
            .list_enabled_workflows()
            .await
            .map_err(|e| SchedulerError::WorkflowListing {
                reason: e.to_string(),
            })?
            .into_iter()
            .filter(|w| w.has_trigger_from(TriggerSource::Schedule))
            .collect();

        let trigger_data = InboundEvent::scheduled().to_trigger_data();
        let results: Vec<_> = stream::iter(candidates)
            .map(|workflow| {
                let executor = self.executor.clone();
                let trigger_data = trigger_data.clone();
                async move {
                    info!(workflow = %workflow.name, workflow_id = %workflow.id, "Executing scheduled workflow");
                    let result = executor.execute_workflow(workflow.id, trigger_data).await;
                    (workflow, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut summary = SweepSummary::default();
        for (workflow, result) in results {
            match result {
                Ok(log) => summary.record(log.status),
                Err(report) => {
                    error!(workflow_id = %workflow.id, error = %report, "Scheduled workflow failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            executed = summary.executed,
            failed = summary.failed,
            "Scheduled run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingListing, RejectingLogs, scheduler_with};
    use paperbridge_workflow::{ActionTarget, InMemoryStore, LogStore, Workflow};
    use serde_json::json;

    fn scheduled(name: &str) -> Workflow {
        Workflow::new(name).with_trigger(TriggerSource::Schedule, "scheduled_run", None)
    }

    #[tokio::test]
    async fn runs_only_scheduled_enabled_workflows() {
        let store = Arc::new(InMemoryStore::new());
        let nightly = scheduled("nightly");
        let hourly = scheduled("hourly");
        let webhook_only = Workflow::new("webhook")
            .with_trigger(TriggerSource::Paperless, "document_created", None);
        let disabled = scheduled("disabled").with_enabled(false);
        for wf in [&nightly, &hourly, &webhook_only, &disabled] {
            store.save_workflow(wf.clone()).unwrap();
        }

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&store) as Arc<dyn LogStore>);
        let summary = scheduler.run_scheduled_workflows().await.unwrap();

        assert_eq!(summary.executed, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);

        let logs = store.logs_for_workflow(nightly.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(
            logs[0].input_data,
            json!({"source": "schedule", "event_type": "scheduled_run"})
        );
        assert!(store.logs_for_workflow(webhook_only.id).unwrap().is_empty());
        assert!(store.logs_for_workflow(disabled.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_sweep() {
        let store = Arc::new(InMemoryStore::new());
        let broken = scheduled("broken")
            .with_action(ActionTarget::Lexoffice, "sync_contact", json!({"correspondent_name": "X"}));
        let unloggable = scheduled("unloggable");
        let fine = scheduled("fine");
        for wf in [&broken, &unloggable, &fine] {
            store.save_workflow(wf.clone()).unwrap();
        }

        let logs = Arc::new(RejectingLogs::new(unloggable.id));
        let scheduler = scheduler_with(Arc::clone(&store), logs.clone() as Arc<dyn LogStore>);
        let summary = scheduler.run_scheduled_workflows().await.unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                executed: 2,
                succeeded: 1,
                skipped: 0,
                errored: 1,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn concurrency_is_at_least_one() {
        let store = Arc::new(InMemoryStore::new());
        store.save_workflow(scheduled("only")).unwrap();

        let executor = crate::testing::executor(
            Arc::clone(&store) as Arc<dyn WorkflowStore>,
            Arc::clone(&store) as Arc<dyn LogStore>,
        );
        let scheduler = Scheduler::new(Arc::clone(&store) as Arc<dyn WorkflowStore>, executor, 0);

        assert_eq!(scheduler.run_scheduled_workflows().await.unwrap().executed, 1);
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let executor = crate::testing::executor(
            Arc::new(FailingListing),
            Arc::clone(&store) as Arc<dyn LogStore>,
        );
        let scheduler = Scheduler::new(Arc::new(FailingListing), executor, 4);

        let report = scheduler.run_scheduled_workflows().await.unwrap_err();
        assert!(report.to_string().contains("failed to list workflows"));
    }
}
