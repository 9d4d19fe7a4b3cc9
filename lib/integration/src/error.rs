//! Error types for the integration crate.
//!
//! `ConnectorError` is the single failure type every connector operation
//! returns. The workflow engine treats any of these as fatal to the run, so
//! the `Display` text is what ends up in the execution record.

use std::fmt;

/// Errors from connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Connection to the service failed before a response arrived.
    ConnectionFailed { reason: String },
    /// The service answered with a non-success status.
    HttpStatus { status: u16, body: String },
    /// The response body could not be decoded.
    InvalidResponse { reason: String },
    /// The client could not be built from its configuration.
    InvalidConfig { reason: String },
    /// Timeout waiting for response.
    Timeout,
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::HttpStatus { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            Self::InvalidResponse { reason } => {
                write!(f, "invalid response: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid connector configuration: {reason}")
            }
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse {
                reason: e.to_string(),
            }
        } else if e.is_builder() {
            Self::InvalidConfig {
                reason: e.to_string(),
            }
        } else {
            Self::ConnectionFailed {
                reason: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display() {
        let err = ConnectorError::HttpStatus {
            status: 422,
            body: "voucherNumber missing".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 422: voucherNumber missing");
    }

    #[test]
    fn connection_failed_display() {
        let err = ConnectorError::ConnectionFailed {
            reason: "host unreachable".to_string(),
        };
        assert!(err.to_string().contains("connection failed"));
        assert!(err.to_string().contains("host unreachable"));
    }

    #[test]
    fn json_error_becomes_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("malformed json");
        let err = ConnectorError::from(json_err);
        assert!(matches!(err, ConnectorError::InvalidResponse { .. }));
    }
}
