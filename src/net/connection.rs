//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Run one request/response loop per accepted connection
//! - Switch replies to the cancelled line once shutdown is observed
//! - Generate unique connection IDs for tracing
//! - Count live connections for shutdown reporting
//!
//! # State Machine
//! ```text
//! Reading ──line──▶ Responding(Accepted | Cancelled) ──▶ Reading
//!    │
//!    └──EOF / error──▶ Responding(Error) ──▶ Closed
//! ```
//! A failed write also leads straight to `Closed`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::config::ProtocolConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::response::Reply;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks how many connection handlers are alive.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

/// Failure reading a request from an established connection.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("peer closed the connection")]
    Closed,

    #[error("request line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("request line is not valid UTF-8")]
    InvalidUtf8,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerState {
    Reading,
    Responding(Reply),
    Closed,
}

/// What a handler did before its connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub id: ConnectionId,
    pub accepted: u64,
    pub cancelled: u64,
    pub closed_on_error: bool,
}

/// Owns one connection from accept until close.
pub struct ConnectionHandler<S> {
    stream: BufReader<S>,
    guard: ConnectionGuard,
    shutdown: ShutdownSignal,
    protocol: Arc<ProtocolConfig>,
    draining: bool,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        guard: ConnectionGuard,
        shutdown: ShutdownSignal,
        protocol: Arc<ProtocolConfig>,
    ) -> Self {
        Self {
            stream: BufReader::new(stream),
            guard,
            shutdown,
            protocol,
            draining: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    /// Serve requests until the peer disconnects or the stream fails.
    ///
    /// Cancellation never closes the connection by itself: after shutdown is
    /// observed every further request is answered with the cancelled line.
    pub async fn run(mut self) -> ConnectionSummary {
        let mut summary = ConnectionSummary {
            id: self.id(),
            accepted: 0,
            cancelled: 0,
            closed_on_error: false,
        };

        let mut state = HandlerState::Reading;
        loop {
            state = match state {
                HandlerState::Reading => {
                    self.observe_shutdown();
                    self.read_next().await
                }
                HandlerState::Responding(reply) => {
                    match reply {
                        Reply::Accepted => summary.accepted += 1,
                        Reply::Cancelled => summary.cancelled += 1,
                        Reply::Error => summary.closed_on_error = true,
                    }
                    self.respond(reply).await
                }
                HandlerState::Closed => break,
            };
        }

        self.close().await;
        tracing::debug!(
            accepted = summary.accepted,
            cancelled = summary.cancelled,
            closed_on_error = summary.closed_on_error,
            "Connection closed"
        );
        summary
    }

    /// Returns whether the handler is in drain mode.
    fn observe_shutdown(&mut self) -> bool {
        if !self.draining && self.shutdown.is_cancelled() {
            self.draining = true;
            tracing::debug!("Shutdown observed, draining connection");
        }
        self.draining
    }

    async fn read_next(&mut self) -> HandlerState {
        match self.read_request().await {
            Ok(request) => {
                // The read is not interrupted by shutdown, so decide the reply
                // by the state at the moment the request arrived.
                let reply = if self.observe_shutdown() {
                    Reply::Cancelled
                } else {
                    Reply::Accepted
                };
                tracing::debug!(request = %request, reply = ?reply, "Request received");
                HandlerState::Responding(reply)
            }
            Err(StreamError::Closed) => {
                tracing::debug!("Peer closed connection");
                HandlerState::Responding(Reply::Error)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error reading from connection");
                HandlerState::Responding(Reply::Error)
            }
        }
    }

    async fn read_request(&mut self) -> Result<String, StreamError> {
        let limit = self.protocol.max_line_bytes;
        let mut line = Vec::new();

        // Room for the limit plus a "\r\n" terminator.
        let read = (&mut self.stream)
            .take(limit as u64 + 2)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Err(StreamError::Closed);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        if line.len() > limit {
            return Err(StreamError::LineTooLong { limit });
        }

        String::from_utf8(line).map_err(|_| StreamError::InvalidUtf8)
    }

    async fn respond(&mut self, reply: Reply) -> HandlerState {
        let line = reply.encode(&self.protocol);
        let stream = self.stream.get_mut();

        let written = match stream.write_all(&line).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, reply = ?reply, "Error writing response");
            return HandlerState::Closed;
        }

        if reply.keeps_connection() {
            HandlerState::Reading
        } else {
            HandlerState::Closed
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            tracing::trace!(error = %e, "Shutdown of write half failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
    use tokio::task::JoinHandle;

    struct Harness {
        client: BufReader<DuplexStream>,
        shutdown: Shutdown,
        tracker: ConnectionTracker,
        handler: JoinHandle<ConnectionSummary>,
    }

    fn spawn_handler(protocol: ProtocolConfig) -> Harness {
        let (client, server) = duplex(4096);
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let handler = ConnectionHandler::new(
            server,
            tracker.track(),
            shutdown.subscribe(),
            Arc::new(protocol),
        );
        Harness {
            client: BufReader::new(client),
            shutdown,
            tracker,
            handler: tokio::spawn(handler.run()),
        }
    }

    async fn request(client: &mut BufReader<DuplexStream>, line: &[u8]) -> String {
        client.get_mut().write_all(line).await.unwrap();
        let mut response = String::new();
        client.read_line(&mut response).await.unwrap();
        response
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.to_string().starts_with("conn-"));
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);
        assert_ne!(guard1.id(), guard2.id());

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn accepts_until_shutdown_then_cancels() {
        let mut h = spawn_handler(ProtocolConfig::default());

        for _ in 0..3 {
            assert_eq!(
                request(&mut h.client, b"PAYMENT|10\n").await,
                "Transaction Accepted\n"
            );
        }

        h.shutdown.trigger();
        // Drain mode keeps the connection open for further requests.
        assert_eq!(
            request(&mut h.client, b"PAYMENT|10\n").await,
            "Transaction Cancelled\n"
        );
        assert_eq!(
            request(&mut h.client, b"REFUND|5\r\n").await,
            "Transaction Cancelled\n"
        );

        drop(h.client);
        let summary = h.handler.await.unwrap();
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.cancelled, 2);
        assert!(summary.closed_on_error);
        assert_eq!(h.tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn request_pending_at_shutdown_is_cancelled() {
        let mut h = spawn_handler(ProtocolConfig::default());
        assert_eq!(request(&mut h.client, b"A\n").await, "Transaction Accepted\n");

        // Handler is now blocked reading the next line.
        tokio::task::yield_now().await;
        h.shutdown.trigger();
        assert_eq!(request(&mut h.client, b"B\n").await, "Transaction Cancelled\n");
    }

    #[tokio::test]
    async fn payload_is_opaque() {
        let mut h = spawn_handler(ProtocolConfig::default());
        for line in [&b"not a command\n"[..], &b"\n"[..], &b"|||\n"[..]] {
            assert_eq!(request(&mut h.client, line).await, "Transaction Accepted\n");
        }
    }

    #[tokio::test]
    async fn peer_half_close_sends_error_and_closes() {
        let mut h = spawn_handler(ProtocolConfig::default());
        assert_eq!(request(&mut h.client, b"A\n").await, "Transaction Accepted\n");

        h.client.get_mut().shutdown().await.unwrap();
        let mut rest = String::new();
        h.client.read_line(&mut rest).await.unwrap();
        assert_eq!(rest, "Transaction Error\n");

        let summary = h.handler.await.unwrap();
        assert!(summary.closed_on_error);

        rest.clear();
        assert_eq!(h.client.read_line(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unterminated_final_line_counts_as_request() {
        let mut h = spawn_handler(ProtocolConfig::default());
        h.client.get_mut().write_all(b"LAST").await.unwrap();
        h.client.get_mut().shutdown().await.unwrap();

        let mut replies = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut h.client, &mut replies)
            .await
            .unwrap();
        assert_eq!(replies, "Transaction Accepted\nTransaction Error\n");
        assert_eq!(h.handler.await.unwrap().accepted, 1);
    }

    #[tokio::test]
    async fn oversized_line_is_a_stream_error() {
        let protocol = ProtocolConfig {
            max_line_bytes: 8,
            ..ProtocolConfig::default()
        };
        let mut h = spawn_handler(protocol);

        assert_eq!(request(&mut h.client, b"12345678\n").await, "Transaction Accepted\n");
        assert_eq!(
            request(&mut h.client, b"123456789\n").await,
            "Transaction Error\n"
        );

        let summary = h.handler.await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert!(summary.closed_on_error);
    }

    #[tokio::test]
    async fn crlf_terminator_does_not_count_toward_limit() {
        let protocol = ProtocolConfig {
            max_line_bytes: 8,
            ..ProtocolConfig::default()
        };
        let mut h = spawn_handler(protocol);

        assert_eq!(request(&mut h.client, b"12345678\r\n").await, "Transaction Accepted\n");
        assert_eq!(request(&mut h.client, b"12345678\n").await, "Transaction Accepted\n");
        assert_eq!(
            request(&mut h.client, b"123456789\r\n").await,
            "Transaction Error\n"
        );

        let summary = h.handler.await.unwrap();
        assert_eq!(summary.accepted, 2);
        assert!(summary.closed_on_error);
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_stream_error() {
        let mut h = spawn_handler(ProtocolConfig::default());
        assert_eq!(
            request(&mut h.client, b"\xff\xfe\n").await,
            "Transaction Error\n"
        );
        assert!(h.handler.await.unwrap().closed_on_error);
    }

    #[tokio::test]
    async fn configured_response_lines_are_used() {
        let protocol = ProtocolConfig {
            accepted: "OK".into(),
            cancelled: "LATER".into(),
            ..ProtocolConfig::default()
        };
        let mut h = spawn_handler(protocol);
        assert_eq!(request(&mut h.client, b"x\n").await, "OK\n");
        h.shutdown.trigger();
        assert_eq!(request(&mut h.client, b"x\n").await, "LATER\n");
    }
}
