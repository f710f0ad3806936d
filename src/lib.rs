//! Line-oriented TCP transaction server with coordinated graceful shutdown.
//!
//! # Architecture Overview
//!
//! ```text
//!   SIGINT / SIGTERM
//!         │
//!         ▼
//!   ┌──────────────┐  notify  ┌─────────────────────┐
//!   │SignalWatcher │─────────▶│ ShutdownCoordinator │── grace period ──▶ exit
//!   └──────────────┘          └──────────┬──────────┘
//!                                        │ cancel (once)
//!                          ┌─────────────┴──────────────┐
//!                          ▼                            ▼
//!                    ┌──────────┐  spawn     ┌───────────────────┐
//!     client ───────▶│ Acceptor │───────────▶│ ConnectionHandler │ (one per connection)
//!                    └──────────┘            └───────────────────┘
//! ```
//!
//! Each request is one line; each reply is one of three configured lines
//! (`Transaction Accepted`, `Transaction Cancelled`, `Transaction Error`).

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use lifecycle::{Shutdown, ShutdownReport};
pub use server::TxnServer;
