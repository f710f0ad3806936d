//! Response lines written back to clients.

use crate::config::ProtocolConfig;

/// The three possible outcomes of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Request received while the server is running normally.
    Accepted,
    /// Request received after shutdown began.
    Cancelled,
    /// The stream failed; the connection closes after this reply.
    Error,
}

impl Reply {
    /// Whether the connection stays open after this reply.
    pub fn keeps_connection(self) -> bool {
        !matches!(self, Reply::Error)
    }

    /// Encode the reply as a newline terminated line.
    pub fn encode(self, protocol: &ProtocolConfig) -> Vec<u8> {
        let text = match self {
            Reply::Accepted => &protocol.accepted,
            Reply::Cancelled => &protocol.cancelled,
            Reply::Error => &protocol.error,
        };
        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lines() {
        let protocol = ProtocolConfig::default();
        assert_eq!(Reply::Accepted.encode(&protocol), b"Transaction Accepted\n");
        assert_eq!(Reply::Cancelled.encode(&protocol), b"Transaction Cancelled\n");
        assert_eq!(Reply::Error.encode(&protocol), b"Transaction Error\n");
    }

    #[test]
    fn only_error_closes() {
        assert!(Reply::Accepted.keeps_connection());
        assert!(Reply::Cancelled.keeps_connection());
        assert!(!Reply::Error.keeps_connection());
    }
}
