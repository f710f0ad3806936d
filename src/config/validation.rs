//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the bind address, framing limit and log filter
//! - Keep the three response lines distinct and single-line
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{ProtocolConfig, ServerConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a host:port address")]
    InvalidBindAddress(String),

    #[error("protocol.{0} must not be empty")]
    EmptyResponse(&'static str),

    #[error("protocol.{0} must be a single line")]
    MultiLineResponse(&'static str),

    #[error("protocol.{0} and protocol.{1} must differ")]
    DuplicateResponse(&'static str, &'static str),

    #[error("protocol.max_line_bytes must be greater than zero")]
    ZeroLineLimit,

    #[error("observability.log_level {0:?} is not a valid filter: {1}")]
    InvalidLogLevel(String, String),
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    validate_protocol(&config.protocol, &mut errors);

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
            e.to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts socket addresses and `host:port`. Names are resolved at bind time.
fn is_host_port(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && !host.contains([':', '[', ']'])
                && !host.contains(char::is_whitespace)
                && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

fn validate_protocol(protocol: &ProtocolConfig, errors: &mut Vec<ValidationError>) {
    let lines = [
        ("accepted", &protocol.accepted),
        ("cancelled", &protocol.cancelled),
        ("error", &protocol.error),
    ];

    for (name, line) in lines {
        if line.is_empty() {
            errors.push(ValidationError::EmptyResponse(name));
        } else if line.contains(['\n', '\r']) {
            errors.push(ValidationError::MultiLineResponse(name));
        }
    }

    // Clients tell the outcomes apart by text alone.
    for (i, &(a, line_a)) in lines.iter().enumerate() {
        for &(b, line_b) in &lines[i + 1..] {
            if line_a == line_b {
                errors.push(ValidationError::DuplicateResponse(a, b));
            }
        }
    }

    if protocol.max_line_bytes == 0 {
        errors.push(ValidationError::ZeroLineLimit);
    }
}
