//! Bridge transport errors

use livedesk_core::fabric::FabricError;
use thiserror::Error;

/// Maximum bridge response body size (16 MB)
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    /// The envelope carried an `error` instead of a `result`
    #[error("{method} failed: {message}")]
    Remote { method: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },
}

/// Read a response body with size limit and deserialize as JSON.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BridgeError> {
    if let Some(length) = response.content_length() {
        if length > MAX_RESPONSE_SIZE as u64 {
            return Err(BridgeError::ResponseTooLarge { size: length });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(BridgeError::ResponseTooLarge { size: bytes.len() as u64 });
    }
    serde_json::from_slice(&bytes).map_err(Into::into)
}

/// Check HTTP response status before processing body.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(BridgeError::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for BridgeError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<BridgeError> for FabricError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout(message) => Self::Timeout(message),
            BridgeError::Http { status, url } if status == reqwest::StatusCode::NOT_FOUND => {
                Self::NotFound(url)
            }
            BridgeError::Remote { method, message } => Self::Remote { method, message },
            BridgeError::Parse(message) => Self::Decode(message),
            other => Self::Rpc(other.to_string()),
        }
    }
}
