//! Lexoffice / Lexware Office REST client.
//!
//! All requests go through the client's `RequestThrottle`, so a single client
//! never exceeds the API's request rate no matter how its callers interleave.

use crate::connector::{AccountingService, ConnectionStatus, Connector, ContactQuery};
use crate::error::ConnectorError;
use crate::http::{ensure_success, json_body};
use crate::rate_limit::RequestThrottle;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::instrument;

/// Client for the Lexoffice public API, authenticated with a bearer API key.
#[derive(Debug)]
pub struct LexofficeClient {
    http: reqwest::Client,
    base_url: String,
    throttle: RequestThrottle,
}

impl LexofficeClient {
    /// Builds a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the API key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        throttle: RequestThrottle,
    ) -> Result<Self, ConnectorError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            ConnectorError::InvalidConfig {
                reason: format!("lexoffice api key: {e}"),
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
            throttle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Waits for the throttle, sends, and rejects non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ConnectorError> {
        self.throttle.acquire().await;
        let response = request.send().await?;
        ensure_success(response).await
    }

    async fn profile(&self) -> Result<JsonValue, ConnectorError> {
        let response = self.send(self.http.get(self.url("/v1/profile"))).await?;
        json_body(response).await
    }
}

#[async_trait]
impl Connector for LexofficeClient {
    fn name(&self) -> &'static str {
        "Lexoffice"
    }

    async fn test_connection(&self) -> ConnectionStatus {
        match self.profile().await {
            Ok(profile) => {
                let organization = profile
                    .get("organizationId")
                    .cloned()
                    .unwrap_or_else(|| JsonValue::String(String::new()));
                ConnectionStatus::connected(
                    "Connected to Lexoffice",
                    serde_json::json!({ "organization": organization }),
                )
            }
            Err(e) => ConnectionStatus::failed(&e),
        }
    }
}

#[async_trait]
impl AccountingService for LexofficeClient {
    #[instrument(skip(self, voucher))]
    async fn create_voucher(&self, voucher: JsonValue) -> Result<JsonValue, ConnectorError> {
        let request = self.http.post(self.url("/v1/vouchers")).json(&voucher);
        json_body(self.send(request).await?).await
    }

    #[instrument(skip(self))]
    async fn search_contacts(&self, query: ContactQuery) -> Result<JsonValue, ConnectorError> {
        let request = self
            .http
            .get(self.url("/v1/contacts"))
            .query(&query.to_params());
        json_body(self.send(request).await?).await
    }

    #[instrument(skip(self, contact))]
    async fn create_contact(&self, contact: JsonValue) -> Result<JsonValue, ConnectorError> {
        let request = self.http.post(self.url("/v1/contacts")).json(&contact);
        json_body(self.send(request).await?).await
    }
}
