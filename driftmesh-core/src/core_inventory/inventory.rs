/*
    Inventory - delta response to a DataFilter

    Responsibilities:
    `inventory.rs` defines the response side of the anti-entropy exchange:
    the entries the requester is missing or holds at a stale sequence
    number, plus a counter of candidates dropped to honor the data type's
    response cap.

    Inputs:
    - the data store's candidate computation

    Outputs:
    - inventories the requester merges back into its own store
*/

use crate::core_storage::Entry;
use serde::{Deserialize, Serialize};

/// Delta response: entries the requester lacks, with truncation accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Entries the requester is missing or has stale
    entries: Vec<Entry>,

    /// Candidates dropped because the response cap was hit
    num_dropped: i32,
}

impl Inventory {
    pub fn new(entries: Vec<Entry>, num_dropped: i32) -> Self {
        Inventory {
            entries,
            num_dropped,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn num_dropped(&self) -> i32 {
        self.num_dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the peer had to truncate; another round will be needed
    pub fn truncated(&self) -> bool {
        self.num_dropped > 0
    }
}
