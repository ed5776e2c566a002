/*
    Metadata - per data-type replication policy

    Responsibilities:
    `metadata.rs` defines the immutable policy constants attached to each
    replicated data type: time-to-live, inventory response cap, payload size
    limit and priority class. One instance exists per data type; it is part
    of the local code base and never replicated.

    Inputs:
    - compile-time/type registration constants

    Outputs:
    - static policy values consumed by the data store and inventory service
*/

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time-to-live, matching the longest-lived data types
const DEFAULT_TTL: Duration = Duration::from_secs(10 * 24 * 60 * 60);

/// Default cap on entries returned in a single inventory response
const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default payload size limit in bytes
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 100_000;

/// Immutable policy for one replicated data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Name of the data type this policy applies to
    type_name: String,

    /// How long an entry (or tombstone) lives without a refresh
    #[serde(with = "humantime_serde")]
    time_to_live: Duration,

    /// Max entries returned in one inventory response
    max_entries: usize,

    /// Max serialized payload size in bytes
    max_payload_bytes: usize,

    /// Priority class, higher is served first when responses are truncated
    priority: u8,
}

impl Metadata {
    /// Create a policy for a data type with default limits
    pub fn new(type_name: impl Into<String>) -> Self {
        Metadata {
            type_name: type_name.into(),
            time_to_live: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            priority: 0,
        }
    }

    /// Builder: set time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Builder: set the inventory response cap
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Builder: set the payload size limit
    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Builder: set the priority class
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }
}
