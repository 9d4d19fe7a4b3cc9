//! Response helpers shared by the HTTP clients.

use crate::error::ConnectorError;
use reqwest::Response;
use serde_json::Value as JsonValue;

/// Turns a non-success response into `ConnectorError::HttpStatus`.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ConnectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ConnectorError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

/// Decodes a JSON body; an empty body decodes to `null`.
pub(crate) async fn json_body(response: Response) -> Result<JsonValue, ConnectorError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
