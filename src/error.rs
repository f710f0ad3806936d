//! Startup errors surfaced to `main`.
//!
//! Only startup can fail the process. Accept and stream errors are logged
//! where they happen and never leave their task.

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::ListenerError;
use crate::observability::LoggingError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("failed to install signal handlers: {0}")]
    Signals(std::io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}
