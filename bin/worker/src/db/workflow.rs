//! Database repository for workflows, triggers, and actions.

use super::{decode_error, store_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paperbridge_core::{ActionId, TriggerId, WorkflowId};
use paperbridge_workflow::{
    Action, ActionTarget, StoreError, Trigger, TriggerSource, Workflow, WorkflowStore,
};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::str::FromStr;

/// Row type for workflow queries.
#[derive(FromRow)]
struct WorkflowRow {
    id: String,
    name: String,
    description: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn try_into_workflow(self) -> Result<Workflow, sqlx::Error> {
        let id = WorkflowId::from_str(&self.id)
            .map_err(|e| decode_error("workflow id", &self.id, e))?;
        Ok(Workflow {
            id,
            name: self.name,
            description: self.description,
            enabled: self.enabled,
            triggers: Vec::new(),
            actions: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row type for trigger queries.
#[derive(FromRow)]
struct TriggerRow {
    id: String,
    workflow_id: String,
    source: String,
    event_type: String,
    conditions: Option<JsonValue>,
    sort_order: i32,
}

impl TriggerRow {
    fn try_into_trigger(self) -> Result<Trigger, sqlx::Error> {
        Ok(Trigger {
            id: TriggerId::from_str(&self.id).map_err(|e| decode_error("trigger id", &self.id, e))?,
            workflow_id: WorkflowId::from_str(&self.workflow_id)
                .map_err(|e| decode_error("workflow id", &self.workflow_id, e))?,
            source: TriggerSource::from_str(&self.source)
                .map_err(|e| decode_error("trigger source", &self.source, e))?,
            event_type: self.event_type,
            conditions: self.conditions,
            sort_order: self.sort_order,
        })
    }
}

/// Row type for action queries.
#[derive(FromRow)]
struct ActionRow {
    id: String,
    workflow_id: String,
    target: String,
    action_type: String,
    parameters: JsonValue,
    sort_order: i32,
}

impl ActionRow {
    fn try_into_action(self) -> Result<Action, sqlx::Error> {
        let parameters = match self.parameters {
            JsonValue::Object(map) => map,
            JsonValue::Null => serde_json::Map::new(),
            other => {
                return Err(decode_error("action parameters", &self.id, format!("not an object: {other}")));
            }
        };
        Ok(Action {
            id: ActionId::from_str(&self.id).map_err(|e| decode_error("action id", &self.id, e))?,
            workflow_id: WorkflowId::from_str(&self.workflow_id)
                .map_err(|e| decode_error("workflow id", &self.workflow_id, e))?,
            target: ActionTarget::from_str(&self.target)
                .map_err(|e| decode_error("action target", &self.target, e))?,
            action_type: self.action_type,
            parameters,
            sort_order: self.sort_order,
        })
    }
}

/// Repository for workflow definitions.
#[derive(Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a workflow by ID, with its triggers and actions.
    pub async fn find_by_id(&self, id: WorkflowId) -> Result<Option<Workflow>, sqlx::Error> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, enabled, created_at, updated_at
            FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut workflows = vec![row.try_into_workflow()?];
        self.attach_children(&mut workflows).await?;
        Ok(workflows.pop())
    }

    /// Lists enabled workflows, with their triggers and actions.
    pub async fn list_enabled(&self) -> Result<Vec<Workflow>, sqlx::Error> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, enabled, created_at, updated_at
            FROM workflows
            WHERE enabled = TRUE
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = rows
            .into_iter()
            .map(WorkflowRow::try_into_workflow)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_children(&mut workflows).await?;
        Ok(workflows)
    }

    /// Loads the triggers and actions of `workflows` in two queries.
    ///
    /// Children arrive in (sort_order, id) order; ids are ULIDs, so ties
    /// keep insertion order.
    async fn attach_children(&self, workflows: &mut [Workflow]) -> Result<(), sqlx::Error> {
        if workflows.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = workflows.iter().map(|w| w.id.to_string()).collect();

        let trigger_rows: Vec<TriggerRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, source, event_type, conditions, sort_order
            FROM triggers
            WHERE workflow_id = ANY($1)
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let action_rows: Vec<ActionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, target, action_type, parameters, sort_order
            FROM actions
            WHERE workflow_id = ANY($1)
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<WorkflowId, &mut Workflow> =
            workflows.iter_mut().map(|w| (w.id, w)).collect();
        for row in trigger_rows {
            let trigger = row.try_into_trigger()?;
            if let Some(workflow) = by_id.get_mut(&trigger.workflow_id) {
                workflow.triggers.push(trigger);
            }
        }
        for row in action_rows {
            let action = row.try_into_action()?;
            if let Some(workflow) = by_id.get_mut(&action.workflow_id) {
                workflow.actions.push(action);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for WorkflowRepository {
    async fn get_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        self.find_by_id(id).await.map_err(store_error)
    }

    async fn list_enabled_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        self.list_enabled().await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_row_decodes() {
        let workflow_id = WorkflowId::new();
        let trigger_id = TriggerId::new();
        let trigger = TriggerRow {
            id: trigger_id.to_string(),
            workflow_id: workflow_id.to_string(),
            source: "paperless".to_string(),
            event_type: "document_created".to_string(),
            conditions: Some(json!({"field": "document_id", "operator": "exists", "value": true})),
            sort_order: 2,
        }
        .try_into_trigger()
        .unwrap();

        assert_eq!(trigger.id, trigger_id);
        assert_eq!(trigger.workflow_id, workflow_id);
        assert_eq!(trigger.source, TriggerSource::Paperless);
        assert_eq!(trigger.sort_order, 2);
    }

    #[test]
    fn trigger_row_rejects_unknown_source() {
        let row = TriggerRow {
            id: TriggerId::new().to_string(),
            workflow_id: WorkflowId::new().to_string(),
            source: "email".to_string(),
            event_type: "received".to_string(),
            conditions: None,
            sort_order: 0,
        };
        assert!(matches!(row.try_into_trigger(), Err(sqlx::Error::Decode(_))));
    }

    #[test]
    fn action_row_accepts_null_parameters() {
        let action = ActionRow {
            id: ActionId::new().to_string(),
            workflow_id: WorkflowId::new().to_string(),
            target: "lexoffice".to_string(),
            action_type: "sync_contact".to_string(),
            parameters: JsonValue::Null,
            sort_order: 0,
        }
        .try_into_action()
        .unwrap();

        assert_eq!(action.target, ActionTarget::Lexoffice);
        assert!(action.parameters.is_empty());
    }

    #[test]
    fn action_row_rejects_list_parameters() {
        let row = ActionRow {
            id: ActionId::new().to_string(),
            workflow_id: WorkflowId::new().to_string(),
            target: "paperless".to_string(),
            action_type: "set_tag".to_string(),
            parameters: json!([1, 2]),
            sort_order: 0,
        };
        assert!(row.try_into_action().is_err());
    }

    #[test]
    fn workflow_row_rejects_bad_id() {
        let row = WorkflowRow {
            id: "not-a-ulid".to_string(),
            name: "broken".to_string(),
            description: None,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(row.try_into_workflow().is_err());
    }
}
