//! Paperless-ngx REST client.

use crate::connector::{ConnectionStatus, Connector, DocumentService, DocumentUpload};
use crate::error::ConnectorError;
use crate::http::{ensure_success, json_body};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LOCATION};
use reqwest::multipart::{Form, Part};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for the Paperless-ngx API, authenticated with an API token.
#[derive(Debug, Clone)]
pub struct PaperlessClient {
    http: reqwest::Client,
    base_url: String,
}

impl PaperlessClient {
    /// Builds a client for `base_url` using `Token` authentication.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the token is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ConnectorError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {token}")).map_err(|e| {
            ConnectorError::InvalidConfig {
                reason: format!("paperless token: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn api_index(&self) -> Result<JsonValue, ConnectorError> {
        let response = self.http.get(self.url("/api/")).send().await?;
        json_body(ensure_success(response).await?).await
    }
}

#[async_trait]
impl Connector for PaperlessClient {
    fn name(&self) -> &'static str {
        "Paperless-ngx"
    }

    async fn test_connection(&self) -> ConnectionStatus {
        match self.api_index().await {
            Ok(index) => ConnectionStatus::connected("Connected to Paperless-ngx", index),
            Err(e) => ConnectionStatus::failed(&e),
        }
    }
}

#[async_trait]
impl DocumentService for PaperlessClient {
    #[instrument(skip(self))]
    async fn get_document(&self, document_id: i64) -> Result<JsonValue, ConnectorError> {
        let response = self
            .http
            .get(self.url(&format!("/api/documents/{document_id}/")))
            .send()
            .await?;
        json_body(ensure_success(response).await?).await
    }

    #[instrument(skip(self))]
    async fn download_document(&self, document_id: i64) -> Result<Vec<u8>, ConnectorError> {
        let response = self
            .http
            .get(self.url(&format!("/api/documents/{document_id}/download/")))
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, upload), fields(filename = %upload.filename, size = upload.file_content.len()))]
    async fn upload_document(&self, upload: DocumentUpload) -> Result<JsonValue, ConnectorError> {
        let mut form = Form::new();
        if let Some(title) = upload.title.filter(|t| !t.is_empty()) {
            form = form.text("title", title);
        }
        if let Some(correspondent) = upload.correspondent {
            form = form.text("correspondent", correspondent.to_string());
        }
        if let Some(document_type) = upload.document_type {
            form = form.text("document_type", document_type.to_string());
        }
        for tag in &upload.tags {
            form = form.text("tags", tag.to_string());
        }
        let document = Part::bytes(upload.file_content)
            .file_name(upload.filename)
            .mime_str("application/octet-stream")?;
        form = form.part("document", document);

        let response = self
            .http
            .post(self.url("/api/documents/post_document/"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let task_id = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = json_body(response).await?;
        if body.is_null() {
            debug!("upload accepted without a response body");
            return Ok(serde_json::json!({ "status": "accepted", "task_id": task_id }));
        }
        Ok(body)
    }

    #[instrument(skip(self, data))]
    async fn update_document(
        &self,
        document_id: i64,
        data: JsonValue,
    ) -> Result<JsonValue, ConnectorError> {
        let response = self
            .http
            .patch(self.url(&format!("/api/documents/{document_id}/")))
            .json(&data)
            .send()
            .await?;
        json_body(ensure_success(response).await?).await
    }
}
