/*
    StoreRegistry - routing table from data type to its DataStore

    Responsibilities:
    `registry.rs` owns one DataStore per registered data type and routes
    inventory queries and mutation envelopes to the right store. It also
    merges inventory responses (per-entry failures counted, never fatal)
    and drives the periodic eviction sweep across all stores.

    Inputs:
    - data type registrations at node startup
    - DataFilter queries and Entry envelopes from the inventory service

    Outputs:
    - Inventory deltas, merge statistics, eviction counts
*/

use crate::core_inventory::{DataFilter, Inventory};
use crate::core_storage::entry::Entry;
use crate::core_storage::errors::{StorageError, StorageResult};
use crate::core_storage::metadata::Metadata;
use crate::core_storage::store::DataStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Outcome of merging one inventory response into local state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries accepted into the store
    pub accepted: usize,
    /// Entries rejected (stale sequence, bad signature, tombstoned, ...)
    pub rejected: usize,
}

/// Shared routing table from type name to DataStore
///
/// Clones share the same underlying table, so the inventory service and
/// the eviction task can hold independent handles.
#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    stores: Arc<DashMap<String, DataStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data type and return a handle to its store
    pub fn register(&self, metadata: Metadata) -> DataStore {
        let store = DataStore::new(metadata);
        self.register_store(store.clone());
        store
    }

    /// Register a pre-built store (custom map size bound)
    pub fn register_store(&self, store: DataStore) {
        let type_name = store.metadata().type_name().to_string();
        info!(data_type = %type_name, "registered data store");
        self.stores.insert(type_name, store);
    }

    /// Handle for a registered data type
    pub fn get(&self, data_type: &str) -> Option<DataStore> {
        self.stores.get(data_type).map(|s| s.value().clone())
    }

    /// Registered type names
    pub fn data_types(&self) -> Vec<String> {
        self.stores.iter().map(|s| s.key().clone()).collect()
    }

    /// Route a mutation envelope to its type's store
    pub fn apply(&self, data_type: &str, entry: Entry) -> StorageResult<()> {
        let store = self
            .get(data_type)
            .ok_or_else(|| StorageError::UnknownDataType(data_type.to_string()))?;
        store.apply(entry)
    }

    /// Answer a peer's filter with the matching store's delta
    pub fn get_inventory(&self, filter: &DataFilter) -> StorageResult<Inventory> {
        let store = self
            .get(filter.data_type())
            .ok_or_else(|| StorageError::UnknownDataType(filter.data_type().to_string()))?;
        store.get_inventory(filter)
    }

    /// Build the local node's outbound filter for a data type
    pub fn build_filter(&self, data_type: &str, max_items: usize) -> StorageResult<DataFilter> {
        let store = self
            .get(data_type)
            .ok_or_else(|| StorageError::UnknownDataType(data_type.to_string()))?;
        Ok(DataFilter::new(data_type).with_items(store.filter_items(max_items)))
    }

    /// Merge a received inventory into local state
    ///
    /// Sequence conflicts and signature failures on individual entries are
    /// counted and skipped; the merge itself never fails.
    pub fn merge(&self, data_type: &str, inventory: Inventory) -> MergeStats {
        let mut stats = MergeStats::default();
        for entry in inventory.into_entries() {
            match self.apply(data_type, entry) {
                Ok(()) => stats.accepted += 1,
                Err(err) => {
                    debug!(data_type, %err, "inventory entry rejected during merge");
                    stats.rejected += 1;
                }
            }
        }
        debug!(
            data_type,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "merged inventory"
        );
        stats
    }

    /// Run one eviction sweep across every store
    pub fn evict_all(&self) -> usize {
        self.stores
            .iter()
            .map(|store| store.value().evict_expired())
            .sum()
    }

    /// Spawn the periodic eviction task; abort the handle to stop it
    pub fn spawn_evictor(&self, sweep_interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // the first tick fires immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = registry.evict_all();
                if evicted > 0 {
                    info!(evicted, "eviction sweep completed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_crypto::Keypair;
    use crate::core_storage::entry::{AddEntry, Payload, RemoveEntry};

    fn signed_add(kp: &Keypair, data_type: &str, data: &[u8], seq: i64) -> AddEntry {
        AddEntry::sign(Payload::new(data_type, data.to_vec()), seq, kp)
    }

    #[test]
    fn test_routing_by_data_type() {
        let registry = StoreRegistry::new();
        registry.register(Metadata::new("offer"));
        registry.register(Metadata::new("chat"));

        let kp = Keypair::generate();
        registry
            .apply("offer", Entry::Add(signed_add(&kp, "offer", b"x", 0)))
            .unwrap();

        assert_eq!(registry.get("offer").unwrap().len(), 1);
        assert_eq!(registry.get("chat").unwrap().len(), 0);
    }

    #[test]
    fn test_unknown_data_type_rejected() {
        let registry = StoreRegistry::new();
        let kp = Keypair::generate();

        let err = registry
            .apply("ghost", Entry::Add(signed_add(&kp, "ghost", b"x", 0)))
            .unwrap_err();
        assert_eq!(err, StorageError::UnknownDataType("ghost".into()));

        let err = registry
            .get_inventory(&DataFilter::new("ghost"))
            .unwrap_err();
        assert_eq!(err, StorageError::UnknownDataType("ghost".into()));
    }

    #[test]
    fn test_merge_counts_rejections_without_failing() {
        let registry = StoreRegistry::new();
        registry.register(Metadata::new("offer"));
        let kp = Keypair::generate();

        let good = signed_add(&kp, "offer", b"good", 0);
        // remove for an unknown hash is rejected during merge
        let orphan_hash = Payload::new("offer", b"orphan".to_vec()).hash();
        let orphan = RemoveEntry::sign(orphan_hash, 1, &kp);

        let inventory = Inventory::new(
            vec![Entry::Add(good), Entry::Remove(orphan)],
            0,
        );
        let stats = registry.merge("offer", inventory);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_build_filter_reflects_store_state() {
        let registry = StoreRegistry::new();
        registry.register(Metadata::new("offer"));
        let kp = Keypair::generate();
        registry
            .apply("offer", Entry::Add(signed_add(&kp, "offer", b"x", 2)))
            .unwrap();

        let filter = registry.build_filter("offer", 100).unwrap();
        assert_eq!(filter.data_type(), "offer");
        assert_eq!(filter.items().len(), 1);
        assert_eq!(filter.items()[0].sequence_number(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evictor_task_sweeps_periodically() {
        use crate::core_storage::entry::now_millis;

        let registry = StoreRegistry::new();
        let store =
            DataStore::new(Metadata::new("offer").with_ttl(Duration::from_secs(60)));
        registry.register_store(store.clone());

        // backdated beyond the TTL so the first sweep evicts it
        let kp = Keypair::generate();
        let expired = AddEntry::sign_at(
            Payload::new("offer", b"x".to_vec()),
            0,
            now_millis() - 120_000,
            &kp,
        );
        store.add(expired).unwrap();

        let task = registry.spawn_evictor(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.is_empty());
        task.abort();
    }
}
