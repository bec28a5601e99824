//! Periodic status sweep over every cached stream
//!
//! Timer-driven sweeps are guarded so at most one runs at a time; a tick that
//! lands while one is in flight is skipped. Forced sweeps ignore the guard and
//! may overlap a timer sweep.

use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::status::StatusService;
use crate::cache::StreamCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Timer,
    Forced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
    /// The sweep did not run because a timer sweep was in flight
    pub skipped: bool,
}

/// Clears the in-flight flag on drop
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StatusPoller {
    status: StatusService,
    cache: StreamCache,
    concurrency: usize,
    in_flight: AtomicBool,
}

impl StatusPoller {
    #[must_use]
    pub fn new(status: StatusService, cache: StreamCache, concurrency: usize) -> Self {
        Self {
            status,
            cache,
            concurrency: concurrency.max(1),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Check every cached stream with at most `concurrency` checks in flight.
    ///
    /// Per-stream failures are logged and leave that entry untouched.
    pub async fn sweep(&self, trigger: SweepTrigger) -> SweepReport {
        let _guard = match trigger {
            SweepTrigger::Timer => match InFlight::try_acquire(&self.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    debug!("Status sweep already in flight, skipping tick");
                    return SweepReport {
                        skipped: true,
                        ..SweepReport::default()
                    };
                }
            },
            SweepTrigger::Forced => None,
        };

        let targets = self.cache.pollable();
        let checked = targets.len();
        let status = &self.status;

        let results: Vec<_> = futures::stream::iter(targets)
            .map(|(slug, object_id)| async move {
                let result = status.refresh(&slug, &object_id).await;
                (slug, object_id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = SweepReport {
            checked,
            ..SweepReport::default()
        };
        for (slug, object_id, result) in results {
            match result {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(slug = %slug, object_id = %object_id, error = %e, "Status check failed");
                }
            }
        }

        debug!(
            trigger = ?trigger,
            checked = report.checked,
            updated = report.updated,
            failed = report.failed,
            "Status sweep finished"
        );
        report
    }

    /// Run timer sweeps every `period` until the handle is dropped or shut
    /// down. The first sweep starts immediately.
    #[must_use]
    pub fn spawn(self: &Arc<Self>, period: Duration) -> PollerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let poller = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "Status poller started");

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let poller = Arc::clone(&poller);
                        tokio::spawn(async move {
                            poller.sweep(SweepTrigger::Timer).await;
                        });
                    }
                }
            }

            info!(period_secs = period.as_secs(), "Status poller stopped");
        });

        PollerHandle {
            token,
            task: Some(task),
        }
    }
}

/// Owns one poller timer; dropping it stops the timer
pub struct PollerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the timer and wait for its loop to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
