//! Server assembly.
//!
//! # Responsibilities
//! - Bind the listener (the only fatal runtime step)
//! - Hand the same cancellation signal to the acceptor and, through it, to
//!   every connection handler
//! - Run the shutdown coordinator until the grace period ends

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lifecycle::{ShutdownCoordinator, ShutdownReport};
use crate::net::{Acceptor, ConnectionTracker};

/// The transaction server, bound and ready to run.
pub struct TxnServer {
    acceptor: Acceptor,
    coordinator: ShutdownCoordinator,
}

impl TxnServer {
    /// Bind the listening socket. Nothing is accepted until [`run`](Self::run).
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let tracker = ConnectionTracker::new();
        let protocol = Arc::new(config.protocol.clone());

        let acceptor = Acceptor::bind(&config.listener, protocol, tracker.clone()).await?;
        let coordinator = ShutdownCoordinator::new(config.shutdown.grace_period(), tracker);

        Ok(Self {
            acceptor,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.acceptor.local_addr()
    }

    /// Serve until `termination` resolves, then drain for the grace period.
    ///
    /// Handlers still running when this returns are abandoned.
    pub async fn run<F>(self, termination: F) -> ShutdownReport
    where
        F: Future,
    {
        let address = self.local_addr().ok();
        tracing::info!(address = ?address, "Transaction server starting");

        tokio::spawn(self.acceptor.run(self.coordinator.subscribe()));

        self.coordinator.run(termination).await
    }
}
