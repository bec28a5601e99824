//! Timeouts and transient-failure classification for fabric calls
//!
//! Retry scheduling itself lives with the transport (`backon` in the bridge
//! client); this module decides what is worth retrying.

pub mod timeout {
    //! Timeout configuration for fabric calls

    use std::time::Duration;

    /// Default timeout for a single bridge request
    pub const BRIDGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Status checks run on a timer and should fail fast
    pub const STATUS_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

    /// Finalize may wait for the commit to be published
    pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(120);

    #[derive(Debug, Clone, Copy)]
    pub struct TimeoutConfig {
        pub request: Duration,
        pub status: Duration,
        pub finalize: Duration,
    }

    impl Default for TimeoutConfig {
        fn default() -> Self {
            Self {
                request: BRIDGE_REQUEST_TIMEOUT,
                status: STATUS_CHECK_TIMEOUT,
                finalize: FINALIZE_TIMEOUT,
            }
        }
    }

    impl TimeoutConfig {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
            self.request = timeout;
            self
        }

        #[must_use]
        pub const fn with_status_timeout(mut self, timeout: Duration) -> Self {
            self.status = timeout;
            self
        }

        #[must_use]
        pub const fn with_finalize_timeout(mut self, timeout: Duration) -> Self {
            self.finalize = timeout;
            self
        }
    }
}

pub mod retry {
    //! Retry classification

    use crate::fabric::FabricError;

    /// Check if an error should be retried
    ///
    /// Checks the error for known transient I/O error kinds, then falls back to
    /// string matching for errors that only carry the message.
    pub fn should_retry_error(err: &(dyn std::error::Error + 'static)) -> bool {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return is_transient_io_error(io_err);
        }

        if let Some(fabric_err) = err.downcast_ref::<FabricError>() {
            return is_transient_fabric_error(fabric_err);
        }

        is_transient_message(&err.to_string())
    }

    /// Transport failures and timeouts are transient. Remote, decode and
    /// not-found errors are answers and retrying will not change them.
    #[must_use]
    pub fn is_transient_fabric_error(err: &FabricError) -> bool {
        match err {
            FabricError::Timeout(_) => true,
            FabricError::Rpc(message) => is_transient_message(message),
            FabricError::Remote { .. }
            | FabricError::NotFound(_)
            | FabricError::EmptyResponse(_)
            | FabricError::Decode(_) => false,
        }
    }

    fn is_transient_message(message: &str) -> bool {
        let message = message.to_lowercase();
        message.contains("timed out")
            || message.contains("timeout")
            || message.contains("connection reset")
            || message.contains("connection refused")
            || message.contains("connection aborted")
            || message.contains("broken pipe")
            || message.contains("502")
            || message.contains("503")
            || message.contains("504")
    }

    fn is_transient_io_error(err: &std::io::Error) -> bool {
        matches!(
            err.kind(),
            std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        )
    }
}
