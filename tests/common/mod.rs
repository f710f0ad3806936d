//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use graceful_txn_server::{ServerConfig, ShutdownReport, TxnServer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A server running on an ephemeral port with a manual shutdown trigger.
pub struct TestServer {
    pub addr: SocketAddr,
    trigger: Option<oneshot::Sender<()>>,
    pub task: JoinHandle<ShutdownReport>,
}

impl TestServer {
    /// Start a server with the given grace period.
    pub async fn start(grace_period: Duration) -> Self {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.shutdown.grace_period_ms = grace_period.as_millis() as u64;

        let server = TxnServer::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));

        // Let the accept loop start.
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            trigger: Some(tx),
            task,
        }
    }

    /// Deliver the termination notification. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.trigger.take() {
            let _ = tx.send(());
        }
    }
}

/// A line-based client, modelled on the self-test client.
pub struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    /// Send one line and read one response line. Empty string means EOF.
    pub async fn request(&mut self, line: &str) -> String {
        self.stream
            .get_mut()
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        self.stream.read_line(&mut response).await.unwrap();
        response
    }
}
