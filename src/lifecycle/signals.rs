//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM at startup
//! - Turn the first one received into a single shutdown notification
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before the listener binds, so installation
//!   failures surface as startup errors
//! - Tokio keeps its handlers registered for the life of the process, so
//!   signals after the first are swallowed instead of killing the process
//!   during the grace period

use std::fmt;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// The termination signal that started shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Waits for the first interrupt or terminate signal.
pub struct SignalWatcher {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl SignalWatcher {
    /// Register the signal handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Block until a termination signal arrives.
    ///
    /// Consumes the watcher: one watcher yields one notification.
    #[cfg(unix)]
    pub async fn wait(mut self) -> TerminationSignal {
        let received = tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
        };
        tracing::info!(signal = %received, "Termination signal received");
        received
    }

    #[cfg(not(unix))]
    pub async fn wait(self) -> TerminationSignal {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
        tracing::info!(signal = %TerminationSignal::Interrupt, "Termination signal received");
        TerminationSignal::Interrupt
    }
}
