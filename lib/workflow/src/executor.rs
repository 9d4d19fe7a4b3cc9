//! Runs one workflow against one trigger event.

use crate::action::ActionRunner;
use crate::context::ExecutionContext;
use crate::error::{ExecutionError, WorkflowError};
use crate::execution::{ActionOutcome, SkipReason, WorkflowLog};
use crate::store::{LogStore, WorkflowStore};
use crate::trigger::first_match;
use paperbridge_core::WorkflowId;
use paperbridge_integration::ConnectorProvider;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// How a run that did not fail ended.
enum RunOutcome {
    Skipped(SkipReason),
    Completed(Vec<ActionOutcome>),
}

/// Loads a workflow, matches its triggers, runs its actions, and records the
/// outcome.
///
/// Executions share nothing but the stores: each one opens its own
/// connectors and keeps its own context, so any number may run concurrently.
#[derive(Clone)]
pub struct WorkflowExecutor {
    workflows: Arc<dyn WorkflowStore>,
    logs: Arc<dyn LogStore>,
    connectors: Arc<dyn ConnectorProvider>,
}

impl WorkflowExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        logs: Arc<dyn LogStore>,
        connectors: Arc<dyn ConnectorProvider>,
    ) -> Self {
        Self {
            workflows,
            logs,
            connectors,
        }
    }

    /// Executes `workflow_id` for `trigger_data` and returns the finished log.
    ///
    /// Problems with the workflow itself (missing, disabled, unmatched, or a
    /// failing action) are recorded in the returned log, never raised.
    ///
    /// # Errors
    ///
    /// Returns `LogPersistence` if the log record cannot be created or
    /// finished.
    #[instrument(skip(self, trigger_data), fields(workflow_id = %workflow_id))]
    pub async fn execute_workflow(
        &self,
        workflow_id: WorkflowId,
        trigger_data: JsonValue,
    ) -> paperbridge_core::Result<WorkflowLog, WorkflowError> {
        let mut log = WorkflowLog::new(workflow_id, trigger_data);
        self.logs
            .create_log(&log)
            .await
            .map_err(|e| WorkflowError::LogPersistence {
                log_id: log.id,
                reason: e.to_string(),
            })?;

        let mut runner = ActionRunner::new(Arc::clone(&self.connectors));
        let outcome = self.run(workflow_id, &log.input_data, &mut runner).await;
        runner.close().await;

        match outcome {
            Ok(RunOutcome::Skipped(reason)) => {
                info!(reason = reason.message(), "Workflow skipped");
                log.skip(reason);
            }
            Ok(RunOutcome::Completed(actions)) => {
                info!(actions = actions.len(), "Workflow completed");
                log.succeed(actions);
            }
            Err(e) => {
                error!(error = %e, "Workflow failed");
                log.fail(e.to_string());
            }
        }
        debug!(
            status = %log.status,
            duration_ms = log.duration().map(|d| d.num_milliseconds()),
            "Execution finished"
        );

        self.logs
            .finish_log(&log)
            .await
            .map_err(|e| WorkflowError::LogPersistence {
                log_id: log.id,
                reason: e.to_string(),
            })?;
        Ok(log)
    }

    async fn run(
        &self,
        workflow_id: WorkflowId,
        trigger_data: &JsonValue,
        runner: &mut ActionRunner,
    ) -> Result<RunOutcome, ExecutionError> {
        let workflow = self
            .workflows
            .get_workflow(workflow_id)
            .await?
            .ok_or(ExecutionError::WorkflowNotFound { workflow_id })?;

        if !workflow.enabled {
            return Ok(RunOutcome::Skipped(SkipReason::Disabled));
        }

        if !workflow.triggers.is_empty() {
            match first_match(workflow.ordered_triggers(), trigger_data) {
                Some(trigger) => {
                    info!(
                        workflow = %workflow.name,
                        trigger = %trigger.event_type,
                        "Trigger matched"
                    );
                }
                None => {
                    debug!(workflow = %workflow.name, "No trigger matched");
                    return Ok(RunOutcome::Skipped(SkipReason::NoTriggerMatched));
                }
            }
        }

        let mut context = ExecutionContext::from_event(trigger_data);
        let mut outcomes = Vec::with_capacity(workflow.actions.len());
        for action in workflow.ordered_actions() {
            info!(action_type = %action.action_type, target = %action.target, "Running action");
            let result = runner.run(action, &mut context).await?;
            context.merge(&result);
            outcomes.push(ActionOutcome {
                action_type: action.action_type.clone(),
                result,
            });
        }

        Ok(RunOutcome::Completed(outcomes))
    }
}
