// Fabric Client Error Types

/// Errors surfaced by a [`super::FabricClient`] implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum FabricError {
    #[error("RPC failed: {0}")]
    Rpc(String),

    /// The call succeeded at the transport level but the response carried an
    /// `error` payload
    #[error("{method} reported an error: {message}")]
    Remote { method: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0} returned an empty response")]
    EmptyResponse(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Call timed out: {0}")]
    Timeout(String),
}

impl FabricError {
    /// Build a [`FabricError::Remote`] from a response-level `error` payload
    #[must_use]
    pub fn remote(method: &str, payload: &serde_json::Value) -> Self {
        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
            .or_else(|| payload.as_str().map(ToString::to_string))
            .unwrap_or_else(|| payload.to_string());
        Self::Remote {
            method: method.to_string(),
            message,
        }
    }
}

impl From<serde_json::Error> for FabricError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FabricError>;
