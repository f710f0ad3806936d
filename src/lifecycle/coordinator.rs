//! Shutdown orchestration.
//!
//! Waits for the termination notification, broadcasts cancellation once,
//! then holds the process for the grace period so handlers can drain.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::net::ConnectionTracker;

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Time spent between the broadcast and the end of the grace period.
    pub drained_for: Duration,
    /// Handlers still alive when the grace period ended.
    pub abandoned_connections: u64,
}

pub struct ShutdownCoordinator {
    shutdown: Shutdown,
    grace_period: Duration,
    tracker: ConnectionTracker,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration, tracker: ConnectionTracker) -> Self {
        Self {
            shutdown: Shutdown::new(),
            grace_period,
            tracker,
        }
    }

    /// Hand out a cancellation signal to a task at creation time.
    pub fn subscribe(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Block until `termination` resolves, broadcast cancellation, then wait
    /// out the grace period.
    ///
    /// The grace period is never cut short, even if every connection has
    /// already closed.
    pub async fn run<F>(self, termination: F) -> ShutdownReport
    where
        F: Future,
    {
        termination.await;

        self.shutdown.trigger();
        let started = Instant::now();
        tracing::info!(
            grace_period_ms = self.grace_period.as_millis() as u64,
            active_connections = self.tracker.active_count(),
            "Starting graceful shutdown"
        );

        tokio::time::sleep(self.grace_period).await;

        let report = ShutdownReport {
            drained_for: started.elapsed(),
            abandoned_connections: self.tracker.active_count(),
        };
        if report.abandoned_connections > 0 {
            tracing::warn!(
                abandoned_connections = report.abandoned_connections,
                "Grace period elapsed with connections still open"
            );
        }
        tracing::info!("Finished graceful shutdown");
        report
    }
}
