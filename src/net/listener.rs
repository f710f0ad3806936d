//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections, one handler task per connection
//! - Stop accepting and close the socket once shutdown is observed
//! - Graceful handling of accept errors

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::config::{ListenerConfig, ProtocolConfig};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionHandler, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Owns the listening socket and spawns a handler per connection.
///
/// The number of concurrent connections is unbounded.
pub struct Acceptor {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Response lines and framing limits handed to every handler.
    protocol: Arc<ProtocolConfig>,
    tracker: ConnectionTracker,
}

impl Acceptor {
    /// Bind to the configured address. Host names are resolved.
    pub async fn bind(
        config: &ListenerConfig,
        protocol: Arc<ProtocolConfig>,
        tracker: ConnectionTracker,
    ) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(config.bind_address.as_str())
            .await
            .map_err(ListenerError::Bind)?;

        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self {
            inner: listener,
            protocol,
            tracker,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Accept connections until shutdown, then close the listening socket.
    ///
    /// Returns the number of connections accepted.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> u64 {
        let handler_signal = shutdown.clone();
        let mut accepted = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.inner.accept() => match result {
                    Ok((stream, peer_addr)) => {
                        accepted += 1;
                        self.spawn_handler(stream, peer_addr, handler_signal.clone());
                    }
                    Err(e) => {
                        tracing::warn!(error = %ListenerError::Accept(e), "Error accepting connection");
                    }
                },
            }
        }

        let address = self.local_addr().ok();
        drop(self);
        tracing::info!(address = ?address, accepted, "Listener closed");
        accepted
    }

    fn spawn_handler(&self, stream: TcpStream, peer_addr: SocketAddr, shutdown: ShutdownSignal) {
        let guard = self.tracker.track();
        let span = tracing::info_span!(
            "connection",
            connection_id = %guard.id(),
            peer_addr = %peer_addr
        );
        tracing::debug!(parent: &span, "Connection accepted");

        let handler = ConnectionHandler::new(stream, guard, shutdown, Arc::clone(&self.protocol));
        tokio::spawn(handler.run().instrument(span));
    }
}
