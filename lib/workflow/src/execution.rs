//! Execution records.
//!
//! Every call to the executor produces exactly one `WorkflowLog`. It is
//! persisted as `running` before anything else happens and updated once to a
//! terminal status:
//!
//! ```text
//! running ──▶ skipped   (disabled, or no trigger matched)
//!         ──▶ success   (every action succeeded)
//!         ──▶ error     (missing workflow, store failure, or an action failed)
//! ```

use crate::error::ParseTagError;
use chrono::{DateTime, Utc};
use paperbridge_core::{WorkflowId, WorkflowLogId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;
use std::str::FromStr;

/// Status of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Running,
    Skipped,
    Success,
    Error,
}

impl LogStatus {
    /// Returns the stored name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Skipped => "skipped",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "skipped" => Ok(Self::Skipped),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(ParseTagError {
                kind: "log status",
                value: other.to_string(),
            }),
        }
    }
}

/// Why a run was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoTriggerMatched,
}

impl SkipReason {
    /// The message recorded in the log output.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Disabled => "Workflow is disabled",
            Self::NoTriggerMatched => "No trigger matched",
        }
    }
}

/// One completed action and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action_type: String,
    pub result: Map<String, JsonValue>,
}

/// Record of a single workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLog {
    /// Unique identifier.
    pub id: WorkflowLogId,
    /// The workflow that was requested, whether or not it exists.
    pub workflow_id: WorkflowId,
    /// Current status.
    pub status: LogStatus,
    /// The trigger event the run was started with.
    pub input_data: JsonValue,
    /// Skip reason or action results.
    pub output_data: Option<JsonValue>,
    /// Failure text when the run ended in `error`.
    pub error_message: Option<String>,
    /// When the run started.
    pub executed_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowLog {
    /// Creates a `running` record.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, input_data: JsonValue) -> Self {
        Self {
            id: WorkflowLogId::new(),
            workflow_id,
            status: LogStatus::Running,
            input_data,
            output_data: None,
            error_message: None,
            executed_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the run as skipped.
    pub fn skip(&mut self, reason: SkipReason) {
        self.output_data = Some(json!({ "reason": reason.message() }));
        self.finish(LogStatus::Skipped);
    }

    /// Marks the run as successful with the results of every action.
    pub fn succeed(&mut self, actions: Vec<ActionOutcome>) {
        self.output_data = Some(json!({ "actions": actions }));
        self.finish(LogStatus::Success);
    }

    /// Marks the run as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.finish(LogStatus::Error);
    }

    fn finish(&mut self, status: LogStatus) {
        debug_assert!(!self.status.is_terminal(), "log finished twice");
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Returns the run duration once finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.executed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_log_is_running() {
        let log = WorkflowLog::new(WorkflowId::new(), json!({"source": "paperless"}));
        assert_eq!(log.status, LogStatus::Running);
        assert!(log.finished_at.is_none());
        assert!(log.duration().is_none());
    }

    #[test]
    fn skip_records_reason() {
        let mut log = WorkflowLog::new(WorkflowId::new(), json!({}));
        log.skip(SkipReason::NoTriggerMatched);
        assert_eq!(log.status, LogStatus::Skipped);
        assert_eq!(log.output_data, Some(json!({"reason": "No trigger matched"})));
        assert!(log.finished_at.is_some());
    }

    #[test]
    fn success_records_actions_in_order() {
        let mut log = WorkflowLog::new(WorkflowId::new(), json!({}));
        let mut result = Map::new();
        result.insert("tagged".to_string(), json!(true));
        log.succeed(vec![ActionOutcome {
            action_type: "set_tag".to_string(),
            result,
        }]);

        assert_eq!(log.status, LogStatus::Success);
        assert_eq!(
            log.output_data,
            Some(json!({"actions": [{"action_type": "set_tag", "result": {"tagged": true}}]}))
        );
        assert!(log.duration().is_some());
    }

    #[test]
    fn failure_keeps_output_empty() {
        let mut log = WorkflowLog::new(WorkflowId::new(), json!({}));
        log.fail("HTTP 500: boom");
        assert_eq!(log.status, LogStatus::Error);
        assert_eq!(log.error_message.as_deref(), Some("HTTP 500: boom"));
        assert!(log.output_data.is_none());
    }

    #[test]
    fn status_text() {
        for status in [LogStatus::Running, LogStatus::Skipped, LogStatus::Success, LogStatus::Error] {
            assert_eq!(status.as_str().parse::<LogStatus>().unwrap(), status);
        }
        assert!(!LogStatus::Running.is_terminal());
        assert!(LogStatus::Error.is_terminal());
    }
}
