//! driftmesh-core
//!
//! Peer-to-peer authenticated distributed data store with inventory-based
//! anti-entropy. Each node holds one replica map per data type; signed
//! Add/Refresh/Remove envelopes mutate it under a strict per-hash
//! sequence-successor rule, and divergent replicas converge through
//! repeated DataFilter/Inventory exchanges over any transport that speaks
//! the NetCommand/NetEvent seam.

pub mod config;
pub mod core_crypto;
pub mod core_inventory;
pub mod core_net;
pub mod core_storage;
pub mod logging;

pub use config::SyncConfig;
pub use core_crypto::{EntryHash, Keypair};
pub use core_inventory::{
    DataFilter, FilterItem, Inventory, InventoryService, RequestError, RoundStats, SyncEvent,
    SyncMessage,
};
pub use core_net::{CloseReason, ConnectionId, ConnectionRegistry, NetCommand, NetEvent};
pub use core_storage::{
    AddEntry, DataStore, Entry, Metadata, Payload, RefreshEntry, RemoveEntry, StorageError,
    StoreRegistry,
};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = SyncConfig::default();
        let _ = Metadata::new("offer");
    }
}
