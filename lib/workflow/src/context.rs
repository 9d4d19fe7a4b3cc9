//! Data threaded between the actions of one execution.

use crate::condition::is_truthy;
use serde_json::{Map, Value as JsonValue};

/// Mutable key/value context private to a single workflow execution.
///
/// Seeded from the trigger event; each action's result is merged in after
/// the action succeeds, so later actions see earlier outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    values: Map<String, JsonValue>,
}

impl ExecutionContext {
    /// Seeds a context from the top-level keys of `event`.
    ///
    /// A non-object event yields an empty context.
    #[must_use]
    pub fn from_event(event: &JsonValue) -> Self {
        Self {
            values: event.as_object().cloned().unwrap_or_default(),
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Returns the value under `key` if it is truthy.
    #[must_use]
    pub fn get_truthy(&self, key: &str) -> Option<&JsonValue> {
        self.get(key).filter(|v| is_truthy(v))
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: JsonValue) {
        self.values.insert(key.into(), value);
    }

    /// Shallow-merges `result` into the context; its keys win.
    pub fn merge(&mut self, result: &Map<String, JsonValue>) {
        for (key, value) in result {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Returns the context as a JSON object map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.values
    }
}
