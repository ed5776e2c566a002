/*
    EntryHash - content hash keying the replicated store

    Responsibilities:
    `hash.rs` defines the 256-bit content hash used as the map key for every
    replicated entry. The hash is derived from the payload (Blake3), so a
    payload change always produces a new key.

    Inputs:
    - payload bytes (type name + data)

    Outputs:
    - 256-bit entry hashes
    - comparison operators for deterministic ordering
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// 256-bit payload-derived hash identifying one replicated entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryHash([u8; 32]);

impl EntryHash {
    /// Create an EntryHash from raw 32 bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        EntryHash(bytes)
    }

    /// Hash arbitrary data using Blake3
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake3::hash(data);

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(hash.as_bytes());
        EntryHash(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to Vec<u8>
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display as hex string (first 8 bytes for readability)
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl PartialOrd for EntryHash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryHash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}
