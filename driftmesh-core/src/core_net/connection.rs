/*
    Connection seam - transport-agnostic connection abstraction

    Responsibilities:
    `connection.rs` defines the boundary between the sync core and the
    transport layer: connection identities, close reasons, the outbound
    command channel (send/close) and the inbound event channel
    (opened/closed/frame). The transport (Tor/TCP, handshake, encryption)
    lives outside this crate and speaks only these two enums.

    Inputs:
    - NetEvent values produced by the transport
    - NetCommand values produced by the inventory service

    Outputs:
    - the current open-connection set for outbound request fan-out
*/

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of one established connection to a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        ConnectionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why a connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Remote peer disconnected
    PeerDisconnected,
    /// Local node is shutting down
    Shutdown,
    /// Transport-level failure
    TransportError,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerDisconnected => write!(f, "peer disconnected"),
            CloseReason::Shutdown => write!(f, "shutdown"),
            CloseReason::TransportError => write!(f, "transport error"),
        }
    }
}

/// Commands the sync core sends to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCommand {
    /// Deliver an encoded frame on a connection
    Send {
        connection: ConnectionId,
        frame: Vec<u8>,
    },
}

/// Events the transport delivers to the sync core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// A connection to a peer was established
    Opened(ConnectionId),
    /// A connection went away
    Closed {
        connection: ConnectionId,
        reason: CloseReason,
    },
    /// An encoded frame arrived on a connection
    Frame {
        connection: ConnectionId,
        bytes: Vec<u8>,
    },
}

/// Live view of the currently open connections
///
/// Clones share the same underlying set. Fed by NetEvent::Opened/Closed;
/// read by the inventory service when fanning out requests.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    open: Arc<DashMap<ConnectionId, ()>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh connection id (transport-side helper)
    pub fn allocate_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn open(&self, connection: ConnectionId) {
        self.open.insert(connection, ());
    }

    pub fn close(&self, connection: ConnectionId) {
        self.open.remove(&connection);
    }

    pub fn is_open(&self, connection: ConnectionId) -> bool {
        self.open.contains_key(&connection)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Snapshot of open connections, ordered by id for deterministic fan-out
    pub fn open_connections(&self) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> =
            self.open.iter().map(|entry| *entry.key()).collect();
        connections.sort_by_key(|c| c.0);
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_lifecycle() {
        let registry = ConnectionRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert_ne!(a, b);

        registry.open(a);
        registry.open(b);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_open(a));

        registry.close(a);
        assert!(!registry.is_open(a));
        assert_eq!(registry.open_connections(), vec![b]);
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let registry = ConnectionRegistry::new();
        registry.open(ConnectionId::new(9));
        registry.open(ConnectionId::new(1));
        registry.open(ConnectionId::new(5));

        let ids: Vec<u64> = registry
            .open_connections()
            .iter()
            .map(|c| c.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 5, 9]);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(ConnectionId::new(3).to_string(), "conn-3");
        assert_eq!(CloseReason::Shutdown.to_string(), "shutdown");
    }
}
