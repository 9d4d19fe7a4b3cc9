//! Workflow definition types.
//!
//! A workflow is a named automation that consists of:
//! - Metadata (name, description, enabled flag, timestamps)
//! - Triggers, any one of which starts the workflow
//! - Actions, run in order once a trigger matched

use crate::action::{Action, ActionTarget};
use crate::trigger::{Trigger, TriggerSource};
use chrono::{DateTime, Utc};
use paperbridge_core::WorkflowId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// Description of what this workflow does.
    pub description: Option<String>,
    /// Disabled workflows are skipped.
    pub enabled: bool,
    /// Triggers; a workflow without triggers runs on any event.
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Actions.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates an enabled workflow with no triggers or actions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            description: None,
            enabled: true,
            triggers: Vec::new(),
            actions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Adds a trigger listening for `source`/`event_type`.
    ///
    /// The trigger is placed after every existing trigger.
    #[must_use]
    pub fn with_trigger(
        mut self,
        source: TriggerSource,
        event_type: impl Into<String>,
        conditions: Option<JsonValue>,
    ) -> Self {
        let mut trigger = Trigger::new(self.id, source, event_type)
            .with_sort_order(next_sort_order(self.triggers.iter().map(|t| t.sort_order)));
        trigger.conditions = conditions;
        self.triggers.push(trigger);
        self
    }

    /// Adds an action, placed after every existing action.
    #[must_use]
    pub fn with_action(
        mut self,
        target: ActionTarget,
        action_type: impl Into<String>,
        parameters: JsonValue,
    ) -> Self {
        let action = Action::new(self.id, target, action_type)
            .with_parameters(parameters)
            .with_sort_order(next_sort_order(self.actions.iter().map(|a| a.sort_order)));
        self.actions.push(action);
        self
    }

    /// Triggers in evaluation order: ascending sort order, ties in stored order.
    #[must_use]
    pub fn ordered_triggers(&self) -> Vec<&Trigger> {
        let mut triggers: Vec<&Trigger> = self.triggers.iter().collect();
        triggers.sort_by_key(|t| t.sort_order);
        triggers
    }

    /// Actions in execution order: ascending sort order, ties in stored order.
    #[must_use]
    pub fn ordered_actions(&self) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().collect();
        actions.sort_by_key(|a| a.sort_order);
        actions
    }

    /// Returns true if any trigger listens to `source`.
    #[must_use]
    pub fn has_trigger_from(&self, source: TriggerSource) -> bool {
        self.triggers.iter().any(|t| t.source == source)
    }

    /// Returns true if any trigger listens to exactly `source` and `event_type`.
    #[must_use]
    pub fn listens_to(&self, source: TriggerSource, event_type: &str) -> bool {
        self.triggers
            .iter()
            .any(|t| t.source == source && t.event_type == event_type)
    }

    /// Renders the workflow as a Mermaid flowchart.
    ///
    /// Every trigger fans out from a start node; actions form a chain fed by
    /// all triggers (or by the start node when there are none) and ending in
    /// a finish node.
    #[must_use]
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["graph TD".to_string(), "    start([Start])".to_string()];

        let triggers = self.ordered_triggers();
        for (i, trigger) in triggers.iter().enumerate() {
            lines.push(format!("    T{i}{{{{{}: {}}}}}", trigger.source, trigger.event_type));
            lines.push(format!("    start --> T{i}"));
        }

        let mut previous: Vec<String> = (0..triggers.len()).map(|i| format!("T{i}")).collect();
        if previous.is_empty() {
            previous.push("start".to_string());
        }

        for (j, action) in self.ordered_actions().iter().enumerate() {
            let node = format!("A{j}");
            lines.push(format!("    {node}[{}: {}]", action.target, action.action_type));
            for prev in &previous {
                lines.push(format!("    {prev} --> {node}"));
            }
            previous = vec![node];
        }

        lines.push("    finish([End])".to_string());
        for prev in &previous {
            lines.push(format!("    {prev} --> finish"));
        }

        lines.join("\n")
    }
}

fn next_sort_order(existing: impl Iterator<Item = i32>) -> i32 {
    existing.max().map_or(0, |max| max + 1)
}
