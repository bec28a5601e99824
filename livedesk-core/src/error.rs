use thiserror::Error;

use crate::fabric::FabricError;
use crate::models::StreamStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fabric error: {0}")]
    Fabric(#[from] FabricError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Stream {slug} is not ready to start (status: {status})")]
    NotReady { slug: String, status: StreamStatus },

    #[error("Ladder profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Part not available for copy: {0}")]
    PartNotAvailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another operation is already running on {0}")]
    Busy(String),

    /// Some requested playout sub-writes failed. `committed` is the version
    /// holding the ones that succeeded, if any did.
    #[error("Playout settings for {slug} failed: {}", failed.join(", "))]
    PlayoutIncomplete {
        slug: String,
        failed: Vec<&'static str>,
        committed: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors raised before any remote mutation was attempted
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. }
                | Self::StreamNotFound(_)
                | Self::ProfileNotFound(_)
                | Self::InvalidInput(_)
                | Self::Busy(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Declared failure policy of a single orchestration step.
///
/// `Fatal` steps abort the surrounding operation and surface the error to the
/// caller. `BestEffort` steps log the failure and let the operation continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    BestEffort,
    Fatal,
}

impl FailurePolicy {
    /// Run `fut` under this policy.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` for a swallowed
    /// best-effort failure, and `Err` for a fatal failure.
    pub async fn run<T, E, F>(self, step: &'static str, fut: F) -> Result<Option<T>>
    where
        F: std::future::Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        match fut.await {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                let err = err.into();
                match self {
                    Self::BestEffort => {
                        tracing::warn!(step, error = %err, "Best-effort step failed, continuing");
                        Ok(None)
                    }
                    Self::Fatal => {
                        tracing::debug!(step, error = %err, "Fatal step failed");
                        Err(err)
                    }
                }
            }
        }
    }
}
