/*
    DataStore - authoritative replica for one data type

    Responsibilities:
    `store.rs` holds the hash -> entry map for a single data type and
    enforces conflict resolution on signed mutations: adds establish or
    replace a slot, refreshes must be the exact sequence successor, removes
    tombstone the slot, and tombstones are never revived by refresh. It also
    computes inventory deltas against a peer's DataFilter and evicts slots
    past their TTL.

    Inputs:
    - signed Add/Refresh/Remove envelopes from remote peers or the local node
    - DataFilter queries from the inventory service
    - periodic eviction ticks

    Outputs:
    - accepted mutations (map state changes)
    - Inventory deltas with truncation accounting
    - StorageError values for every rejected request
*/

use crate::core_crypto::EntryHash;
use crate::core_inventory::{DataFilter, FilterItem, Inventory};
use crate::core_storage::entry::{now_millis, AddEntry, Entry, RefreshEntry, RemoveEntry};
use crate::core_storage::errors::{StorageError, StorageResult};
use crate::core_storage::metadata::Metadata;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default bound on the number of slots held per data type
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Current state of one map slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredEntry {
    /// Slot holds a live payload-carrying entry
    Live(AddEntry),
    /// Slot is tombstoned; only a strictly newer remove may touch it
    Tombstone(RemoveEntry),
}

impl StoredEntry {
    pub fn sequence_number(&self) -> i64 {
        match self {
            StoredEntry::Live(e) => e.sequence_number(),
            StoredEntry::Tombstone(e) => e.sequence_number(),
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            StoredEntry::Live(e) => e.created_at(),
            StoredEntry::Tombstone(e) => e.created_at(),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        match self {
            StoredEntry::Live(e) => e.public_key(),
            StoredEntry::Tombstone(e) => e.public_key(),
        }
    }

    /// Wire representation for inventory responses
    pub fn to_entry(&self) -> Entry {
        match self {
            StoredEntry::Live(e) => Entry::Add(e.clone()),
            StoredEntry::Tombstone(e) => Entry::Remove(e.clone()),
        }
    }
}

/// Thread-safe replica map for one data type
///
/// Cloning is cheap; clones share the same underlying map. Per-hash
/// mutations are atomic under the slot lock, so two concurrent refreshes
/// for the same hash cannot both pass the expected-sequence check.
#[derive(Debug, Clone)]
pub struct DataStore {
    metadata: Metadata,
    max_map_size: usize,
    map: Arc<DashMap<EntryHash, StoredEntry>>,
}

impl DataStore {
    /// Create an empty store governed by the given policy
    pub fn new(metadata: Metadata) -> Self {
        DataStore {
            metadata,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
            map: Arc::new(DashMap::new()),
        }
    }

    /// Builder: override the map size bound
    pub fn with_max_map_size(mut self, max_map_size: usize) -> Self {
        self.max_map_size = max_map_size;
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, hash: &EntryHash) -> bool {
        self.map.contains_key(hash)
    }

    /// Sequence number currently stored for a hash, if any
    pub fn sequence_number(&self, hash: &EntryHash) -> Option<i64> {
        self.map.get(hash).map(|slot| slot.sequence_number())
    }

    /// Apply any mutation envelope
    pub fn apply(&self, entry: Entry) -> StorageResult<()> {
        match entry {
            Entry::Add(e) => self.add(e),
            Entry::Refresh(e) => self.refresh(e),
            Entry::Remove(e) => self.remove(e),
        }
    }

    /// Store a new entry, or replace a live slot with a higher sequence
    ///
    /// Verification runs in a fixed order before any sequence logic:
    /// signature, payload size, payload type.
    pub fn add(&self, add: AddEntry) -> StorageResult<()> {
        if !add.verify() {
            warn!(hash = %add.hash(), "rejecting add with invalid signature");
            return Err(StorageError::InvalidSignature);
        }

        let size = add.payload().size();
        let limit = self.metadata.max_payload_bytes();
        if size > limit {
            warn!(hash = %add.hash(), size, limit, "rejecting oversized add");
            return Err(StorageError::PayloadTooLarge { size, limit });
        }

        if add.payload().data_type() != self.metadata.type_name() {
            return Err(StorageError::TypeMismatch {
                expected: self.metadata.type_name().to_string(),
                actual: add.payload().data_type().to_string(),
            });
        }

        if add.sequence_number() < 0 {
            return Err(StorageError::SequenceMismatch {
                expected: 0,
                got: add.sequence_number(),
            });
        }

        let hash = add.hash();

        // Size bound is checked outside the slot lock: DashMap::len() must
        // not run while an entry guard is held on the same map.
        if self.map.len() >= self.max_map_size && !self.map.contains_key(&hash) {
            return Err(StorageError::MaxMapSizeReached(self.max_map_size));
        }

        match self.map.entry(hash) {
            MapEntry::Vacant(slot) => {
                debug!(%hash, seq = add.sequence_number(), "stored new entry");
                slot.insert(StoredEntry::Live(add));
                Ok(())
            }
            MapEntry::Occupied(mut slot) => match slot.get() {
                StoredEntry::Live(existing) => {
                    if existing.public_key() != add.public_key() {
                        return Err(StorageError::SignerMismatch);
                    }
                    if add.sequence_number() <= existing.sequence_number() {
                        debug!(
                            %hash,
                            stored = existing.sequence_number(),
                            got = add.sequence_number(),
                            "rejecting stale add"
                        );
                        return Err(StorageError::SequenceMismatch {
                            expected: existing.sequence_number() + 1,
                            got: add.sequence_number(),
                        });
                    }
                    slot.insert(StoredEntry::Live(add));
                    Ok(())
                }
                StoredEntry::Tombstone(_) => Err(StorageError::AlreadyRemoved),
            },
        }
    }

    /// Bump a live entry's sequence number and TTL clock
    ///
    /// Requires the exact sequence successor from the original signer.
    /// Tombstoned hashes are never revivable.
    pub fn refresh(&self, refresh: RefreshEntry) -> StorageResult<()> {
        if !refresh.verify() {
            warn!(hash = %refresh.hash(), "rejecting refresh with invalid signature");
            return Err(StorageError::InvalidSignature);
        }

        match self.map.entry(refresh.hash()) {
            MapEntry::Vacant(_) => Err(StorageError::NoEntry(refresh.hash())),
            MapEntry::Occupied(mut slot) => match slot.get_mut() {
                StoredEntry::Live(existing) => {
                    if existing.public_key() != refresh.public_key() {
                        return Err(StorageError::SignerMismatch);
                    }
                    let expected = existing.sequence_number() + 1;
                    if refresh.sequence_number() != expected {
                        debug!(
                            hash = %refresh.hash(),
                            expected,
                            got = refresh.sequence_number(),
                            "rejecting out-of-order refresh"
                        );
                        return Err(StorageError::SequenceMismatch {
                            expected,
                            got: refresh.sequence_number(),
                        });
                    }
                    existing.apply_refresh(&refresh);
                    Ok(())
                }
                StoredEntry::Tombstone(_) => Err(StorageError::AlreadyRemoved),
            },
        }
    }

    /// Tombstone a live entry, or advance an existing tombstone
    ///
    /// A live slot requires the exact sequence successor; a tombstone
    /// accepts only a strictly higher sequence number. Removes for unknown
    /// hashes are rejected, not parked.
    pub fn remove(&self, remove: RemoveEntry) -> StorageResult<()> {
        if !remove.verify() {
            warn!(hash = %remove.hash(), "rejecting remove with invalid signature");
            return Err(StorageError::InvalidSignature);
        }

        match self.map.entry(remove.hash()) {
            MapEntry::Vacant(_) => Err(StorageError::NoEntry(remove.hash())),
            MapEntry::Occupied(mut slot) => {
                let (signer_matches, min_accepted) = match slot.get() {
                    StoredEntry::Live(existing) => (
                        existing.public_key() == remove.public_key(),
                        existing.sequence_number() + 1,
                    ),
                    StoredEntry::Tombstone(existing) => (
                        existing.public_key() == remove.public_key(),
                        existing.sequence_number() + 1,
                    ),
                };

                if !signer_matches {
                    return Err(StorageError::SignerMismatch);
                }

                let valid = match slot.get() {
                    // live slot: exact successor only
                    StoredEntry::Live(_) => remove.sequence_number() == min_accepted,
                    // tombstone: any strictly higher sequence advances it
                    StoredEntry::Tombstone(_) => remove.sequence_number() >= min_accepted,
                };

                if !valid {
                    debug!(
                        hash = %remove.hash(),
                        expected = min_accepted,
                        got = remove.sequence_number(),
                        "rejecting out-of-order remove"
                    );
                    return Err(StorageError::SequenceMismatch {
                        expected: min_accepted,
                        got: remove.sequence_number(),
                    });
                }

                slot.insert(StoredEntry::Tombstone(remove));
                Ok(())
            }
        }
    }

    /// Compute the delta a peer is missing, honoring the response cap
    ///
    /// Candidates are slots absent from the filter or stored at a strictly
    /// higher sequence number than the filter's claim, ordered by
    /// (created_at, hash) so paging is stable across calls.
    pub fn get_inventory(&self, filter: &DataFilter) -> StorageResult<Inventory> {
        if filter.data_type() != self.metadata.type_name() {
            return Err(StorageError::TypeMismatch {
                expected: self.metadata.type_name().to_string(),
                actual: filter.data_type().to_string(),
            });
        }

        let claims = filter.claims();

        let mut candidates: Vec<(i64, EntryHash, Entry)> = self
            .map
            .iter()
            .filter(|slot| match claims.get(slot.key()) {
                None => true,
                Some(claimed) => slot.value().sequence_number() > *claimed,
            })
            .map(|slot| (slot.value().created_at(), *slot.key(), slot.value().to_entry()))
            .collect();
        candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let candidate_count = candidates.len();
        let max_entries = self.metadata.max_entries();

        let (start, take) = match (filter.offset(), filter.range()) {
            (None, None) => (0usize, candidate_count.min(max_entries)),
            (offset, range) => {
                let offset = offset.unwrap_or(0);
                if offset < 0 {
                    return Err(StorageError::InvalidFilter(format!(
                        "negative offset {offset}"
                    )));
                }
                let offset = offset as usize;
                match range {
                    Some(range) => {
                        if range < 0 {
                            return Err(StorageError::InvalidFilter(format!(
                                "negative range {range}"
                            )));
                        }
                        let range = range as usize;
                        if range > max_entries {
                            return Err(StorageError::InvalidFilter(format!(
                                "range {range} exceeds max entries {max_entries}"
                            )));
                        }
                        if offset + range > candidate_count {
                            return Err(StorageError::InvalidFilter(format!(
                                "offset {offset} + range {range} beyond {candidate_count} candidates"
                            )));
                        }
                        (offset, range)
                    }
                    None => {
                        if offset > candidate_count {
                            return Err(StorageError::InvalidFilter(format!(
                                "offset {offset} beyond {candidate_count} candidates"
                            )));
                        }
                        (offset, (candidate_count - offset).min(max_entries))
                    }
                }
            }
        };

        let entries: Vec<Entry> = candidates
            .into_iter()
            .skip(start)
            .take(take)
            .map(|(_, _, entry)| entry)
            .collect();

        let num_dropped = (candidate_count - entries.len()) as i32;
        debug!(
            data_type = %self.metadata.type_name(),
            candidates = candidate_count,
            returned = entries.len(),
            num_dropped,
            "computed inventory"
        );

        Ok(Inventory::new(entries, num_dropped))
    }

    /// Build this store's own claims for an outbound filter
    ///
    /// Ordered by (created_at, hash) and truncated to `max_items`, so the
    /// oldest (most established) claims survive truncation.
    pub fn filter_items(&self, max_items: usize) -> Vec<FilterItem> {
        let mut claims: Vec<(i64, EntryHash, i64)> = self
            .map
            .iter()
            .map(|slot| (slot.value().created_at(), *slot.key(), slot.value().sequence_number()))
            .collect();
        claims.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        claims
            .into_iter()
            .take(max_items)
            .map(|(_, hash, seq)| FilterItem::new(hash, seq))
            .collect()
    }

    /// Drop every slot (live or tombstone) older than the type's TTL
    ///
    /// Returns the number of evicted slots. Runs independently of request
    /// handling; callers drive it from a periodic task.
    pub fn evict_expired(&self) -> usize {
        let now = now_millis();
        let ttl = self.metadata.time_to_live().as_millis() as i64;

        let before = self.map.len();
        self.map.retain(|_, slot| now - slot.created_at() < ttl);
        let evicted = before - self.map.len();

        if evicted > 0 {
            debug!(
                data_type = %self.metadata.type_name(),
                evicted,
                "evicted expired entries"
            );
        }
        evicted
    }
}
