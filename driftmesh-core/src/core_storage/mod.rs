pub mod entry;
pub mod errors;
pub mod metadata;
pub mod registry;
pub mod store;

pub use entry::{now_millis, AddEntry, Entry, Payload, RefreshEntry, RemoveEntry};
pub use errors::{StorageError, StorageResult};
pub use metadata::Metadata;
pub use registry::{MergeStats, StoreRegistry};
pub use store::{DataStore, StoredEntry};
