//! Operation dispatch
//!
//! Maps the closed set of one-click stream operations to a confirmation
//! prompt, the lifecycle call, and a success or error notification. The
//! confirmation and notification surfaces are traits so a terminal, a UI or
//! a test can provide them.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use super::busy::BusyTracker;
use super::lifecycle::LifecycleService;
use crate::error::{Error, Result};
use crate::models::{Stream, StreamStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Check,
    Start,
    Stop,
    Deactivate,
    Delete,
}

/// Confirmation shown before an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
}

impl Operation {
    pub const ALL: [Self; 5] = [Self::Check, Self::Start, Self::Stop, Self::Deactivate, Self::Delete];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
        }
    }

    #[must_use]
    pub fn prompt(&self, stream: &Stream) -> Prompt {
        let name = &stream.title;
        let (title, message, confirm_label) = match self {
            Self::Check if stream.is_active() => (
                "Check Stream",
                format!("{name} is active. Checking re-reads its status from the fabric. Continue?"),
                "Check",
            ),
            Self::Check => (
                "Check Stream",
                format!("Check the ingest status of {name}?"),
                "Check",
            ),
            Self::Start => (
                "Start Stream",
                format!("Start recording and playout for {name}?"),
                "Start",
            ),
            Self::Stop => (
                "Stop Stream",
                format!("Stop {name}? Viewers will lose playback."),
                "Stop",
            ),
            Self::Deactivate => (
                "Deactivate Stream",
                format!("Deactivate {name}? The recording session will be closed."),
                "Deactivate",
            ),
            Self::Delete => (
                "Delete Stream",
                format!("Permanently delete {name}? This cannot be undone."),
                "Delete",
            ),
        };
        Prompt {
            title: title.to_string(),
            message,
            confirm_label,
        }
    }

    #[must_use]
    pub fn success_message(&self, name: &str) -> String {
        match self {
            Self::Check => format!("Checked {name}"),
            Self::Start => format!("Started {name}"),
            Self::Stop => format!("Stopped {name}"),
            Self::Deactivate => format!("Deactivated {name}"),
            Self::Delete => format!("Deleted {name}"),
        }
    }

    #[must_use]
    pub fn error_message(&self, name: &str) -> String {
        format!("Unable to {} {name}", self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// `true` to proceed
    async fn confirm(&self, prompt: &Prompt) -> bool;
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str, error: &Error);
}

/// Work to run after a successful operation
#[derive(Default)]
pub enum FollowUp {
    #[default]
    None,
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>),
}

impl FollowUp {
    async fn run(self) {
        match self {
            Self::None => {}
            Self::Sync(f) => f(),
            Self::Async(f) => f().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The confirmation was declined; nothing ran
    Cancelled,
    /// The operation ran; carries the reported state when there is one
    Completed(Option<StreamStatus>),
}

pub struct OperationDispatch {
    lifecycle: Arc<LifecycleService>,
    confirmer: Arc<dyn Confirmer>,
    notifier: Arc<dyn Notifier>,
    busy: BusyTracker,
}

impl OperationDispatch {
    #[must_use]
    pub fn new(
        lifecycle: Arc<LifecycleService>,
        confirmer: Arc<dyn Confirmer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            lifecycle,
            confirmer,
            notifier,
            busy: BusyTracker::new(),
        }
    }

    #[must_use]
    pub const fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    /// Confirm, run and notify.
    ///
    /// Success is notified only after the call succeeded, then `follow_up`
    /// runs. Failures are notified and returned.
    pub async fn dispatch(
        &self,
        operation: Operation,
        slug: &str,
        follow_up: FollowUp,
    ) -> Result<DispatchOutcome> {
        let Some(stream) = self.lifecycle.cache().get(slug) else {
            return Err(self.fail(operation, slug, Error::StreamNotFound(slug.to_string())));
        };
        let name = stream.title.clone();

        let Some(_guard) = self.busy.try_acquire(slug, operation.as_str()) else {
            return Err(self.fail(operation, &name, Error::Busy(slug.to_string())));
        };

        if !self.confirmer.confirm(&operation.prompt(&stream)).await {
            info!(slug = %slug, operation = %operation, "Operation cancelled");
            return Ok(DispatchOutcome::Cancelled);
        }

        let result = match operation {
            Operation::Check => self.lifecycle.check(slug).await.map(Some),
            Operation::Start => self.lifecycle.start(slug).await.map(Some),
            Operation::Stop => self.lifecycle.stop(slug).await,
            Operation::Deactivate => self.lifecycle.deactivate(slug).await,
            Operation::Delete => self.lifecycle.delete(slug).await.map(|()| None),
        };

        match result {
            Ok(state) => {
                self.notifier.success(&operation.success_message(&name));
                follow_up.run().await;
                Ok(DispatchOutcome::Completed(state))
            }
            Err(e) => Err(self.fail(operation, &name, e)),
        }
    }

    fn fail(&self, operation: Operation, name: &str, err: Error) -> Error {
        error!(operation = %operation, stream = %name, error = %err, "Operation failed");
        self.notifier.error(&operation.error_message(name), &err);
        err
    }
}
