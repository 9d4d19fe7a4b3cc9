//! Workflow triggers and event matching.
//!
//! A trigger names the source and event type it listens for and optionally
//! carries a condition tree (see [`crate::condition`]) evaluated against the
//! whole event payload.

use crate::condition;
use crate::error::ParseTagError;
use paperbridge_core::{TriggerId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Where an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Paperless-ngx webhooks.
    Paperless,
    /// Lexoffice event subscriptions.
    Lexoffice,
    /// The periodic sweep.
    Schedule,
}

impl TriggerSource {
    /// Returns the wire name of this source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paperless => "paperless",
            Self::Lexoffice => "lexoffice",
            Self::Schedule => "schedule",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerSource {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paperless" => Ok(Self::Paperless),
            "lexoffice" => Ok(Self::Lexoffice),
            "schedule" => Ok(Self::Schedule),
            other => Err(ParseTagError {
                kind: "trigger source",
                value: other.to_string(),
            }),
        }
    }
}

/// A trigger attached to a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique identifier.
    pub id: TriggerId,
    /// The owning workflow.
    pub workflow_id: WorkflowId,
    /// Event source this trigger listens to.
    pub source: TriggerSource,
    /// Event type this trigger listens to.
    pub event_type: String,
    /// Optional condition tree; absent or empty means "always".
    #[serde(default)]
    pub conditions: Option<JsonValue>,
    /// Position among the workflow's triggers.
    #[serde(default)]
    pub sort_order: i32,
}

impl Trigger {
    /// Creates an unconditional trigger.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, source: TriggerSource, event_type: impl Into<String>) -> Self {
        Self {
            id: TriggerId::new(),
            workflow_id,
            source,
            event_type: event_type.into(),
            conditions: None,
            sort_order: 0,
        }
    }

    /// Sets the condition tree.
    #[must_use]
    pub fn with_conditions(mut self, conditions: JsonValue) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns true when the trigger carries a non-empty condition tree.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        self.conditions
            .as_ref()
            .is_some_and(condition::is_truthy)
    }

    /// Returns true if `event` satisfies this trigger.
    ///
    /// The source and event type are only compared when the event carries a
    /// non-empty value for them.
    #[must_use]
    pub fn matches(&self, event: &JsonValue) -> bool {
        if let Some(source) = event_text(event, "source")
            && source != self.source.as_str()
        {
            debug!(event = %source, trigger = %self.source, "Source mismatch");
            return false;
        }

        if let Some(event_type) = event_text(event, "event_type")
            && event_type != self.event_type
        {
            debug!(event = %event_type, trigger = %self.event_type, "Event type mismatch");
            return false;
        }

        match &self.conditions {
            Some(conditions) if self.has_conditions() => condition::evaluate(conditions, event),
            _ => true,
        }
    }
}

/// Returns the first trigger in iteration order that matches `event`.
pub fn first_match<'a, I>(triggers: I, event: &JsonValue) -> Option<&'a Trigger>
where
    I: IntoIterator<Item = &'a Trigger>,
{
    triggers.into_iter().find(|t| t.matches(event))
}

/// A top-level event attribute, if present and non-empty.
///
/// Non-text values are compared by their JSON rendering.
fn event_text(event: &JsonValue, key: &str) -> Option<String> {
    let value = event.get(key)?;
    if !condition::is_truthy(value) {
        return None;
    }
    Some(match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    })
}
