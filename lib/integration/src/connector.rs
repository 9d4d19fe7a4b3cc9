//! Connector traits and the request types they accept.
//!
//! The workflow engine never talks HTTP directly. It sees each external
//! service as a small operation set: every operation either succeeds with a
//! service-defined JSON payload, passed through untouched, or fails with a
//! `ConnectorError`.

use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the service answered successfully.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Service-specific details (API index, organization id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl ConnectionStatus {
    /// A successful probe.
    #[must_use]
    pub fn connected(message: impl Into<String>, details: JsonValue) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Some(details),
        }
    }

    /// A failed probe, described from the error that caused it.
    #[must_use]
    pub fn failed(error: &ConnectorError) -> Self {
        let message = match error {
            ConnectorError::HttpStatus { .. } => error.to_string(),
            other => format!("Connection failed: {other}"),
        };
        Self {
            success: false,
            message,
            details: None,
        }
    }
}

/// A document to hand to the document service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpload {
    /// Raw file bytes.
    pub file_content: Vec<u8>,
    /// File name reported to the service.
    pub filename: String,
    /// Optional document title.
    pub title: Option<String>,
    /// Optional correspondent id.
    pub correspondent: Option<i64>,
    /// Optional document type id.
    pub document_type: Option<i64>,
    /// Tags to apply on ingestion.
    pub tags: Vec<i64>,
}

/// Search filter for accounting contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub name: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self {
            name: None,
            page: 0,
            size: 25,
        }
    }
}

impl ContactQuery {
    /// Searches contacts by name, first page.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Renders the query as URL parameters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        params
    }
}

/// Behavior shared by every external-service connector.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable name for this connector.
    fn name(&self) -> &'static str;

    /// Probes the service. Never fails; failures are described in the status.
    async fn test_connection(&self) -> ConnectionStatus;

    /// Releases held resources. The default does nothing.
    async fn close(&self) {}
}

/// Operations on the document-management service.
#[async_trait]
pub trait DocumentService: Connector {
    /// Fetches document metadata.
    async fn get_document(&self, document_id: i64) -> Result<JsonValue, ConnectorError>;

    /// Downloads the original file bytes.
    async fn download_document(&self, document_id: i64) -> Result<Vec<u8>, ConnectorError>;

    /// Uploads a new document.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<JsonValue, ConnectorError>;

    /// Partially updates a document.
    async fn update_document(
        &self,
        document_id: i64,
        data: JsonValue,
    ) -> Result<JsonValue, ConnectorError>;

    /// Adds a tag to a document: reads the current tags, appends the tag if
    /// absent, and writes the full list back.
    async fn add_tag_to_document(
        &self,
        document_id: i64,
        tag_id: i64,
    ) -> Result<JsonValue, ConnectorError> {
        let document = self.get_document(document_id).await?;
        let mut tags = document
            .get("tags")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();
        if !tags.iter().any(|t| t.as_i64() == Some(tag_id)) {
            tags.push(JsonValue::from(tag_id));
        }
        self.update_document(document_id, serde_json::json!({ "tags": tags }))
            .await
    }
}

/// Operations on the accounting service.
#[async_trait]
pub trait AccountingService: Connector {
    /// Creates a bookkeeping voucher.
    async fn create_voucher(&self, voucher: JsonValue) -> Result<JsonValue, ConnectorError>;

    /// Searches contacts. The response carries matches under `content`.
    async fn search_contacts(&self, query: ContactQuery) -> Result<JsonValue, ConnectorError>;

    /// Creates a contact.
    async fn create_contact(&self, contact: JsonValue) -> Result<JsonValue, ConnectorError>;
}

/// Opens connector handles for one workflow execution.
///
/// Each call returns a fresh handle, so per-connector state such as the
/// Lexoffice request throttle is scoped to the execution that opened it.
pub trait ConnectorProvider: Send + Sync {
    /// Opens the document service.
    fn open_documents(&self) -> Result<Arc<dyn DocumentService>, ConnectorError>;

    /// Opens the accounting service.
    fn open_accounting(&self) -> Result<Arc<dyn AccountingService>, ConnectorError>;
}
