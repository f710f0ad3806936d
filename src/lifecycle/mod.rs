//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → one termination notification
//!
//! Coordinator (coordinator.rs):
//!     Notification → broadcast cancel (shutdown.rs) → grace period → return
//!
//! Observers of the broadcast:
//!     Acceptor → stop accepting, close listening socket
//!     Handlers → answer remaining requests as cancelled
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: tasks check the signal, nothing is aborted
//! - The grace period is a fixed wait, not a "wait for idle"
//! - The broadcast is a single monotonic transition

pub mod coordinator;
pub mod shutdown;
pub mod signals;

pub use coordinator::{ShutdownCoordinator, ShutdownReport};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{SignalWatcher, TerminationSignal};
