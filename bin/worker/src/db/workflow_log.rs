//! Database repository for workflow execution records.

use super::{decode_error, store_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paperbridge_core::{WorkflowId, WorkflowLogId};
use paperbridge_workflow::{LogStatus, LogStore, StoreError, WorkflowLog};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for execution record queries.
#[derive(FromRow)]
struct LogRow {
    id: String,
    workflow_id: String,
    status: String,
    input_data: JsonValue,
    output_data: Option<JsonValue>,
    error_message: Option<String>,
    executed_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl LogRow {
    fn try_into_log(self) -> Result<WorkflowLog, sqlx::Error> {
        Ok(WorkflowLog {
            id: WorkflowLogId::from_str(&self.id)
                .map_err(|e| decode_error("log id", &self.id, e))?,
            workflow_id: WorkflowId::from_str(&self.workflow_id)
                .map_err(|e| decode_error("workflow id", &self.workflow_id, e))?,
            status: LogStatus::from_str(&self.status)
                .map_err(|e| decode_error("log status", &self.status, e))?,
            input_data: self.input_data,
            output_data: self.output_data,
            error_message: self.error_message,
            executed_at: self.executed_at,
            finished_at: self.finished_at,
        })
    }
}

/// Repository for execution records.
#[derive(Clone)]
pub struct WorkflowLogRepository {
    pool: PgPool,
}

impl WorkflowLogRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new record.
    pub async fn insert(&self, log: &WorkflowLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO workflow_logs
                (id, workflow_id, status, input_data, output_data, error_message, executed_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id.to_string())
        .bind(log.workflow_id.to_string())
        .bind(log.status.as_str())
        .bind(&log.input_data)
        .bind(&log.output_data)
        .bind(&log.error_message)
        .bind(log.executed_at)
        .bind(log.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds a record by ID.
    pub async fn find_by_id(&self, id: WorkflowLogId) -> Result<Option<WorkflowLog>, sqlx::Error> {
        let row: Option<LogRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, status, input_data, output_data, error_message,
                   executed_at, finished_at
            FROM workflow_logs
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(LogRow::try_into_log).transpose()
    }

    /// Writes the terminal state of a record still marked `running`.
    ///
    /// Returns false if no running record with that ID exists.
    pub async fn complete(&self, log: &WorkflowLog) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_logs
            SET status = $2, output_data = $3, error_message = $4, finished_at = $5
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(log.id.to_string())
        .bind(log.status.as_str())
        .bind(&log.output_data)
        .bind(&log.error_message)
        .bind(log.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, id: WorkflowLogId) -> Result<bool, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM workflow_logs WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl LogStore for WorkflowLogRepository {
    async fn create_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        self.insert(log).await.map_err(store_error)
    }

    async fn get_log(&self, id: WorkflowLogId) -> Result<Option<WorkflowLog>, StoreError> {
        self.find_by_id(id).await.map_err(store_error)
    }

    async fn finish_log(&self, log: &WorkflowLog) -> Result<(), StoreError> {
        if self.complete(log).await.map_err(store_error)? {
            return Ok(());
        }
        if self.exists(log.id).await.map_err(store_error)? {
            Err(StoreError::AlreadyFinished { log_id: log.id })
        } else {
            Err(StoreError::NotFound {
                entity: "workflow log",
                id: log.id.to_string(),
            })
        }
    }
}
