//! Sync configuration
//!
//! Tunables for the inventory exchange: request timeout, fan-out bound,
//! eviction sweep cadence and store/filter size limits. Defaults match
//! the protocol's expected deployment; builder setters override per node.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default deadline for one outbound inventory request
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on concurrent peer requests per round
const DEFAULT_MAX_REQUESTS_PER_ROUND: usize = 400;

/// Default cadence of the TTL eviction sweep
const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on slots per data store
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Default bound on claims carried in one outbound filter
const DEFAULT_MAX_FILTER_ENTRIES: usize = 2_000;

/// Node-level tunables for the sync protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Deadline for one outbound inventory request
    #[serde(with = "humantime_serde")]
    request_timeout: Duration,

    /// Max peers queried concurrently in one round
    max_requests_per_round: usize,

    /// Cadence of the TTL eviction sweep
    #[serde(with = "humantime_serde")]
    eviction_interval: Duration,

    /// Bound on slots per data store
    max_map_size: usize,

    /// Bound on claims carried in one outbound filter
    max_filter_entries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_requests_per_round: DEFAULT_MAX_REQUESTS_PER_ROUND,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
            max_filter_entries: DEFAULT_MAX_FILTER_ENTRIES,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: override the per-request deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder: override the per-round fan-out bound
    pub fn with_max_requests_per_round(mut self, max: usize) -> Self {
        self.max_requests_per_round = max;
        self
    }

    /// Builder: override the eviction sweep cadence
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Builder: override the per-store slot bound
    pub fn with_max_map_size(mut self, max: usize) -> Self {
        self.max_map_size = max;
        self
    }

    /// Builder: override the outbound filter claim bound
    pub fn with_max_filter_entries(mut self, max: usize) -> Self {
        self.max_filter_entries = max;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_requests_per_round(&self) -> usize {
        self.max_requests_per_round
    }

    pub fn eviction_interval(&self) -> Duration {
        self.eviction_interval
    }

    pub fn max_map_size(&self) -> usize {
        self.max_map_size
    }

    pub fn max_filter_entries(&self) -> usize {
        self.max_filter_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_requests_per_round(), 400);
        assert_eq!(config.eviction_interval(), Duration::from_secs(60));
        assert_eq!(config.max_map_size(), 10_000);
        assert_eq!(config.max_filter_entries(), 2_000);
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::new()
            .with_request_timeout(Duration::from_secs(5))
            .with_max_requests_per_round(10)
            .with_eviction_interval(Duration::from_secs(1))
            .with_max_map_size(100)
            .with_max_filter_entries(50);

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_requests_per_round(), 10);
        assert_eq!(config.eviction_interval(), Duration::from_secs(1));
        assert_eq!(config.max_map_size(), 100);
        assert_eq!(config.max_filter_entries(), 50);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = SyncConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
