//! Error types for the inventory exchange

use crate::core_net::CloseReason;
use thiserror::Error;

/// Result type for outbound inventory requests
pub type RequestResult<T> = Result<T, RequestError>;

/// Failures of one outbound inventory request
///
/// These surface through the per-peer oneshot results; retry policy
/// belongs to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No response arrived within the request deadline
    #[error("inventory request timed out")]
    Timeout,

    /// The connection went away while the request was in flight
    #[error("connection closed: {0}")]
    ConnectionClosed(CloseReason),

    /// The service was shut down with the request in flight
    #[error("service shut down")]
    ServiceShutdown,

    /// The outbound frame could not be handed to the transport
    #[error("failed to send request frame")]
    Send,

    /// Frame encoding failed
    #[error("codec failure: {0}")]
    Codec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RequestError::Timeout.to_string(),
            "inventory request timed out"
        );
        assert_eq!(
            RequestError::ConnectionClosed(CloseReason::PeerDisconnected).to_string(),
            "connection closed: peer disconnected"
        );
    }
}
