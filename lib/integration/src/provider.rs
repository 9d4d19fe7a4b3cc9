//! Connector configuration and the HTTP-backed `ConnectorProvider`.

use crate::connector::{AccountingService, ConnectorProvider, DocumentService};
use crate::error::ConnectorError;
use crate::lexoffice::LexofficeClient;
use crate::paperless::PaperlessClient;
use crate::rate_limit::RequestThrottle;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Paperless-ngx connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperlessConfig {
    /// Base URL of the Paperless-ngx instance.
    #[serde(default = "default_paperless_url")]
    pub url: String,

    /// API token.
    #[serde(default)]
    pub token: String,
}

fn default_paperless_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for PaperlessConfig {
    fn default() -> Self {
        Self {
            url: default_paperless_url(),
            token: String::new(),
        }
    }
}

/// Lexoffice connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LexofficeConfig {
    /// Base URL of the Lexoffice public API.
    #[serde(default = "default_lexoffice_url")]
    pub url: String,

    /// API key.
    #[serde(default)]
    pub api_key: String,

    /// Minimum spacing between requests, in milliseconds.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

fn default_lexoffice_url() -> String {
    "https://api.lexware.io".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    500
}

impl Default for LexofficeConfig {
    fn default() -> Self {
        Self {
            url: default_lexoffice_url(),
            api_key: String::new(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

/// Opens real HTTP clients, one fresh pair per workflow execution.
#[derive(Debug, Clone)]
pub struct HttpConnectorProvider {
    paperless: PaperlessConfig,
    lexoffice: LexofficeConfig,
    timeout: Duration,
}

impl HttpConnectorProvider {
    /// Creates a provider from connection settings and a per-request timeout.
    #[must_use]
    pub fn new(paperless: PaperlessConfig, lexoffice: LexofficeConfig, timeout: Duration) -> Self {
        Self {
            paperless,
            lexoffice,
            timeout,
        }
    }
}

impl ConnectorProvider for HttpConnectorProvider {
    fn open_documents(&self) -> Result<Arc<dyn DocumentService>, ConnectorError> {
        let client = PaperlessClient::new(&self.paperless.url, &self.paperless.token, self.timeout)?;
        Ok(Arc::new(client))
    }

    fn open_accounting(&self) -> Result<Arc<dyn AccountingService>, ConnectorError> {
        let throttle =
            RequestThrottle::new(Duration::from_millis(self.lexoffice.min_request_interval_ms));
        let client = LexofficeClient::new(
            &self.lexoffice.url,
            &self.lexoffice.api_key,
            self.timeout,
            throttle,
        )?;
        Ok(Arc::new(client))
    }
}
