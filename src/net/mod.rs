//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, one task per connection)
//!     → connection.rs (request/response state machine)
//!     → response.rs (accepted / cancelled / error line)
//! ```
//!
//! # Design Decisions
//! - Each connection is owned by exactly one task and closed when it ends
//! - Connections tracked only for shutdown reporting

pub mod connection;
pub mod listener;
pub mod response;

pub use connection::{
    ConnectionGuard, ConnectionHandler, ConnectionId, ConnectionSummary, ConnectionTracker,
    StreamError,
};
pub use listener::{Acceptor, ListenerError};
pub use response::Reply;
