//! Workflow actions and the runner that dispatches them.
//!
//! Each action names an `action_type` which maps to exactly one handler (see
//! [`ActionKind`]). Handlers read their inputs from the action's parameters,
//! falling back to the execution context, call the connectors, and return a
//! result map that the executor merges back into the context.
//!
//! Missing identifiers are not failures: the handler returns a result such as
//! `{"tagged": false, "reason": "..."}` and the run continues. Connector
//! failures and malformed parameters are fatal to the run.

use crate::condition::is_truthy;
use crate::context::ExecutionContext;
use crate::error::{ActionError, ParseTagError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use paperbridge_core::{ActionId, WorkflowId};
use paperbridge_integration::{
    AccountingService, Connector, ConnectorProvider, ContactQuery, DocumentService,
    DocumentUpload,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result map returned by a handler.
pub type ActionResult = Map<String, JsonValue>;

/// The service an action talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    Paperless,
    Lexoffice,
}

impl ActionTarget {
    /// Returns the wire name of this target.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paperless => "paperless",
            Self::Lexoffice => "lexoffice",
        }
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTarget {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paperless" => Ok(Self::Paperless),
            "lexoffice" => Ok(Self::Lexoffice),
            other => Err(ParseTagError {
                kind: "action target",
                value: other.to_string(),
            }),
        }
    }
}

/// An action attached to a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier.
    pub id: ActionId,
    /// The owning workflow.
    pub workflow_id: WorkflowId,
    /// The service this action talks to.
    pub target: ActionTarget,
    /// Handler name, see [`ActionKind`].
    pub action_type: String,
    /// Handler parameters.
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
    /// Position among the workflow's actions.
    #[serde(default)]
    pub sort_order: i32,
}

impl Action {
    /// Creates an action without parameters.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, target: ActionTarget, action_type: impl Into<String>) -> Self {
        Self {
            id: ActionId::new(),
            workflow_id,
            target,
            action_type: action_type.into(),
            parameters: Map::new(),
            sort_order: 0,
        }
    }

    /// Sets the parameters from a JSON object; other values clear them.
    #[must_use]
    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = match parameters {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// The closed set of action handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// `create_lexoffice_voucher`
    CreateVoucher,
    /// `upload_to_paperless`
    UploadDocument,
    /// `sync_contact`
    SyncContact,
    /// `set_tag`
    SetTag,
    /// `download_document`
    DownloadDocument,
}

impl ActionKind {
    /// Every handler, in registry order.
    pub const ALL: [Self; 5] = [
        Self::CreateVoucher,
        Self::UploadDocument,
        Self::SyncContact,
        Self::SetTag,
        Self::DownloadDocument,
    ];

    /// Returns the `action_type` string of this handler.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateVoucher => "create_lexoffice_voucher",
            Self::UploadDocument => "upload_to_paperless",
            Self::SyncContact => "sync_contact",
            Self::SetTag => "set_tag",
            Self::DownloadDocument => "download_document",
        }
    }

    /// The service whose connector the handler writes to.
    #[must_use]
    pub fn target(self) -> ActionTarget {
        match self {
            Self::CreateVoucher | Self::SyncContact => ActionTarget::Lexoffice,
            Self::UploadDocument | Self::SetTag | Self::DownloadDocument => ActionTarget::Paperless,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ActionError::UnknownActionType {
                action_type: s.to_string(),
            })
    }
}

/// Runs actions for one workflow execution.
///
/// Connectors are opened on first use and kept for the rest of the
/// execution. Call [`ActionRunner::close`] when the execution ends.
pub struct ActionRunner {
    connectors: Arc<dyn ConnectorProvider>,
    documents: Option<Arc<dyn DocumentService>>,
    accounting: Option<Arc<dyn AccountingService>>,
}

impl ActionRunner {
    /// Creates a runner that opens connectors through `connectors`.
    #[must_use]
    pub fn new(connectors: Arc<dyn ConnectorProvider>) -> Self {
        Self {
            connectors,
            documents: None,
            accounting: None,
        }
    }

    /// Runs one action against the shared context.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActionType` for an unmapped `action_type`, `Connector`
    /// when a service call fails, and `InvalidParameter` for inputs of the
    /// wrong shape.
    #[instrument(skip(self, action, context), fields(action_type = %action.action_type))]
    pub async fn run(
        &mut self,
        action: &Action,
        context: &mut ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let kind: ActionKind = action.action_type.parse()?;
        if kind.target() != action.target {
            warn!(
                action_type = %kind,
                target = %action.target,
                "Action target does not match the service its handler calls"
            );
        }
        let params = &action.parameters;
        match kind {
            ActionKind::CreateVoucher => self.create_voucher(params, context).await,
            ActionKind::UploadDocument => self.upload_document(params, context).await,
            ActionKind::SyncContact => self.sync_contact(params, context).await,
            ActionKind::SetTag => self.set_tag(params, context).await,
            ActionKind::DownloadDocument => self.download_document(params, context).await,
        }
    }

    /// Releases every connector opened by this runner.
    pub async fn close(&mut self) {
        if let Some(documents) = self.documents.take() {
            documents.close().await;
        }
        if let Some(accounting) = self.accounting.take() {
            accounting.close().await;
        }
    }

    fn documents(&mut self) -> Result<Arc<dyn DocumentService>, ActionError> {
        if let Some(documents) = &self.documents {
            return Ok(Arc::clone(documents));
        }
        let documents = self.connectors.open_documents()?;
        self.documents = Some(Arc::clone(&documents));
        Ok(documents)
    }

    fn accounting(&mut self) -> Result<Arc<dyn AccountingService>, ActionError> {
        if let Some(accounting) = &self.accounting {
            return Ok(Arc::clone(accounting));
        }
        let accounting = self.connectors.open_accounting()?;
        self.accounting = Some(Arc::clone(&accounting));
        Ok(accounting)
    }

    async fn create_voucher(
        &mut self,
        params: &Map<String, JsonValue>,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let accounting = self.accounting()?;
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let mut voucher = Map::new();
        voucher.insert("type".into(), param_or(params, "voucher_type", json!("purchaseinvoice")));
        voucher.insert("voucherNumber".into(), param_or(params, "voucher_number", json!("")));
        voucher.insert("voucherDate".into(), param_or(params, "voucher_date", json!(today)));
        voucher.insert(
            "totalGrossAmount".into(),
            present(params, context, "total_gross_amount")
                .cloned()
                .unwrap_or_else(|| json!(0)),
        );
        voucher.insert("taxType".into(), param_or(params, "tax_type", json!("gross")));
        voucher.insert("voucherItems".into(), param_or(params, "voucher_items", json!([])));
        if let Some(contact_id) = truthy(params, context, "contact_id", "lexoffice_contact_id") {
            voucher.insert("contactId".into(), contact_id.clone());
        }

        let created = accounting.create_voucher(JsonValue::Object(voucher)).await?;
        info!(voucher_id = ?created.get("id"), "Created Lexoffice voucher");
        Ok(into_result(json!({ "voucher": created })))
    }

    async fn upload_document(
        &mut self,
        params: &Map<String, JsonValue>,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let documents = self.documents()?;

        let file_content = match context.get("file_content") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::String(encoded)) => {
                STANDARD
                    .decode(encoded)
                    .map_err(|e| ActionError::InvalidParameter {
                        name: "file_content".to_string(),
                        reason: e.to_string(),
                    })?
            }
            Some(_) => {
                return Err(ActionError::InvalidParameter {
                    name: "file_content".to_string(),
                    reason: "expected base64 text".to_string(),
                });
            }
        };

        let upload = DocumentUpload {
            file_content,
            filename: present(params, context, "filename")
                .map_or_else(|| "document.pdf".to_string(), as_text),
            title: truthy(params, context, "title", "title").map(as_text),
            correspondent: truthy(params, context, "correspondent_id", "correspondent_id")
                .map(|v| as_id("correspondent_id", v))
                .transpose()?,
            document_type: truthy(params, context, "document_type_id", "document_type_id")
                .map(|v| as_id("document_type_id", v))
                .transpose()?,
            tags: truthy(params, context, "tag_ids", "tag_ids")
                .map(|v| as_id_list("tag_ids", v))
                .transpose()?
                .unwrap_or_default(),
        };

        let uploaded = documents.upload_document(upload).await?;
        info!(response = %uploaded, "Uploaded document to Paperless");
        Ok(into_result(json!({ "upload": uploaded })))
    }

    async fn sync_contact(
        &mut self,
        params: &Map<String, JsonValue>,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let name = match present(params, context, "correspondent_name") {
            Some(value) if is_truthy(value) => as_text(value),
            _ => {
                return Ok(into_result(json!({
                    "synced": false,
                    "reason": "No correspondent name provided",
                })));
            }
        };

        let accounting = self.accounting()?;
        let found = accounting
            .search_contacts(ContactQuery::by_name(name.clone()))
            .await?;
        let existing = found
            .get("content")
            .and_then(JsonValue::as_array)
            .and_then(|contacts| contacts.first());

        if let Some(contact) = existing {
            let contact_id = contact.get("id").cloned().unwrap_or_else(|| json!(""));
            info!(contact_id = %contact_id, "Found existing Lexoffice contact");
            return Ok(into_result(json!({
                "synced": true,
                "lexoffice_contact_id": contact_id,
                "created": false,
            })));
        }

        let created = accounting
            .create_contact(json!({
                "version": 0,
                "roles": { "customer": {} },
                "company": { "name": name },
            }))
            .await?;
        let contact_id = created.get("id").cloned().unwrap_or_else(|| json!(""));
        info!(contact_id = %contact_id, "Created new Lexoffice contact");
        Ok(into_result(json!({
            "synced": true,
            "lexoffice_contact_id": contact_id,
            "created": true,
        })))
    }

    async fn set_tag(
        &mut self,
        params: &Map<String, JsonValue>,
        context: &ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let document_id = truthy(params, context, "document_id", "document_id");
        let tag_id = truthy(params, context, "tag_id", "tag_id");
        let (Some(document_id), Some(tag_id)) = (document_id, tag_id) else {
            return Ok(into_result(json!({
                "tagged": false,
                "reason": "Missing document_id or tag_id",
            })));
        };
        let document_id = as_id("document_id", document_id)?;
        let tag_id = as_id("tag_id", tag_id)?;

        let documents = self.documents()?;
        let document = documents.add_tag_to_document(document_id, tag_id).await?;
        info!(tag_id, document_id, "Added tag to document");
        Ok(into_result(json!({ "tagged": true, "document": document })))
    }

    async fn download_document(
        &mut self,
        params: &Map<String, JsonValue>,
        context: &mut ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        let Some(document_id) = truthy(params, context, "document_id", "document_id") else {
            return Ok(into_result(json!({
                "downloaded": false,
                "reason": "Missing document_id",
            })));
        };
        let document_id = as_id("document_id", document_id)?;

        let documents = self.documents()?;
        let content = documents.download_document(document_id).await?;
        let metadata = documents.get_document(document_id).await?;
        let filename = metadata
            .get("original_file_name")
            .filter(|v| !v.is_null())
            .map_or_else(|| format!("document_{document_id}.pdf"), as_text);

        context.set("file_content", JsonValue::String(STANDARD.encode(&content)));
        context.set("filename", JsonValue::String(filename.clone()));
        info!(document_id, size = content.len(), "Downloaded document");
        Ok(into_result(json!({
            "downloaded": true,
            "filename": filename,
            "size": content.len(),
        })))
    }
}

/// Parameter value, or `default` when absent or null.
fn param_or(params: &Map<String, JsonValue>, key: &str, default: JsonValue) -> JsonValue {
    params
        .get(key)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or(default)
}

/// Parameter value if present, else the context value under the same key.
fn present<'a>(
    params: &'a Map<String, JsonValue>,
    context: &'a ExecutionContext,
    key: &str,
) -> Option<&'a JsonValue> {
    params
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| context.get(key).filter(|v| !v.is_null()))
}

/// First truthy value of the parameter `key` or the context entry `context_key`.
fn truthy<'a>(
    params: &'a Map<String, JsonValue>,
    context: &'a ExecutionContext,
    key: &str,
    context_key: &str,
) -> Option<&'a JsonValue> {
    params
        .get(key)
        .filter(|v| is_truthy(v))
        .or_else(|| context.get_truthy(context_key))
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Integral floats at or beyond this magnitude do not fit an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn as_id(name: &str, value: &JsonValue) -> Result<i64, ActionError> {
    let id = match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < I64_BOUND)
                    .map(|f| f as i64)
            }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| ActionError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected an integer id, got {value}"),
    })
}

fn as_id_list(name: &str, value: &JsonValue) -> Result<Vec<i64>, ActionError> {
    match value {
        JsonValue::Array(items) => items.iter().map(|item| as_id(name, item)).collect(),
        other => Err(ActionError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a list of ids, got {other}"),
        }),
    }
}

fn into_result(value: JsonValue) -> ActionResult {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}
