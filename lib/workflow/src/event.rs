//! Normalization of inbound events into trigger data.
//!
//! Webhook payloads differ per service. `InboundEvent` gives them one shape:
//! a source, an event type, and a set of extracted fields. The trigger data
//! handed to the executor is `{source, event_type, ...fields}`.

use crate::condition::is_truthy;
use crate::trigger::TriggerSource;
use serde_json::{Map, Value as JsonValue};

/// Event type used for the periodic sweep.
pub const SCHEDULED_RUN: &str = "scheduled_run";

/// A normalized event from one of the services or the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub source: TriggerSource,
    pub event_type: String,
    pub fields: Map<String, JsonValue>,
}

impl InboundEvent {
    /// Creates an event without extra fields.
    #[must_use]
    pub fn new(source: TriggerSource, event_type: impl Into<String>) -> Self {
        Self {
            source,
            event_type: event_type.into(),
            fields: Map::new(),
        }
    }

    /// The event the periodic sweep runs workflows with.
    #[must_use]
    pub fn scheduled() -> Self {
        Self::new(TriggerSource::Schedule, SCHEDULED_RUN)
    }

    /// Normalizes a Paperless-ngx webhook payload.
    ///
    /// The event type is taken from `event`, then `event_type`, and defaults
    /// to `document_created`. `document_id` falls back to `id`.
    #[must_use]
    pub fn from_paperless(payload: JsonValue) -> Self {
        let event_type = payload
            .get("event")
            .or_else(|| payload.get("event_type"))
            .map_or_else(|| "document_created".to_string(), text);
        let document_id = payload
            .get("document_id")
            .filter(|v| is_truthy(v))
            .or_else(|| payload.get("id"))
            .cloned()
            .unwrap_or(JsonValue::Null);

        Self::new(TriggerSource::Paperless, event_type)
            .with_field("document_id", document_id)
            .with_field("payload", payload)
    }

    /// Normalizes a Lexoffice event subscription payload
    /// (`eventType`, `resourceId`, `organizationId`).
    #[must_use]
    pub fn from_lexoffice(payload: JsonValue) -> Self {
        let event_type = payload
            .get("eventType")
            .map_or_else(|| "unknown".to_string(), text);
        let field = |key: &str| payload.get(key).cloned().unwrap_or(JsonValue::Null);
        let resource_id = field("resourceId");
        let organization_id = field("organizationId");

        Self::new(TriggerSource::Lexoffice, event_type)
            .with_field("resource_id", resource_id)
            .with_field("organization_id", organization_id)
            .with_field("payload", payload)
    }

    /// Adds an extracted field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Builds the trigger data handed to the executor.
    #[must_use]
    pub fn to_trigger_data(&self) -> JsonValue {
        let mut data = Map::new();
        data.insert("source".to_string(), JsonValue::from(self.source.as_str()));
        data.insert("event_type".to_string(), JsonValue::from(self.event_type.as_str()));
        for (key, value) in &self.fields {
            data.insert(key.clone(), value.clone());
        }
        JsonValue::Object(data)
    }
}

fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
