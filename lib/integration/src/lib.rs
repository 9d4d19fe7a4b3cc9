//! Connectors for the two services paperbridge sits between.
//!
//! This crate provides:
//!
//! - **Connector traits**: the operation sets the workflow engine calls
//!   (`DocumentService` for Paperless-ngx, `AccountingService` for Lexoffice)
//! - **HTTP clients**: `PaperlessClient` and `LexofficeClient`
//! - **Request throttle**: minimum spacing between Lexoffice requests
//! - **Provider**: `HttpConnectorProvider`, which opens fresh clients per execution

pub mod connector;
pub mod error;
mod http;
pub mod lexoffice;
pub mod paperless;
pub mod provider;
pub mod rate_limit;

pub use connector::{
    AccountingService, ConnectionStatus, Connector, ConnectorProvider, ContactQuery,
    DocumentService, DocumentUpload,
};
pub use error::ConnectorError;
pub use lexoffice::LexofficeClient;
pub use paperless::PaperlessClient;
pub use provider::{HttpConnectorProvider, LexofficeConfig, PaperlessConfig};
pub use rate_limit::RequestThrottle;
