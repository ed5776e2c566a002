/*
    DataFilter - compact description of a peer's known state

    Responsibilities:
    `filter.rs` defines the request side of the anti-entropy exchange: a set
    of (hash, sequence number) claims describing what the requester already
    holds, plus optional offset/range paging for very large stores.

    Inputs:
    - local store claims (outbound) or decoded peer frames (inbound)

    Outputs:
    - filters consumed by the data store's inventory computation
*/

use crate::core_crypto::EntryHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One claim: "I hold this hash at this sequence number"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
    hash: EntryHash,
    sequence_number: i64,
}

impl FilterItem {
    pub fn new(hash: EntryHash, sequence_number: i64) -> Self {
        FilterItem {
            hash,
            sequence_number,
        }
    }

    pub fn hash(&self) -> EntryHash {
        self.hash
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }
}

/// Requester's view of one data type, sent to a peer to compute the delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFilter {
    /// Data type the filter applies to
    data_type: String,

    /// Claims about already-held entries
    items: Vec<FilterItem>,

    /// Optional paging start within the ordered candidate set
    offset: Option<i32>,

    /// Optional paging width; bounded by the type's max_entries
    range: Option<i32>,
}

impl DataFilter {
    /// Create an empty filter (requester holds nothing)
    pub fn new(data_type: impl Into<String>) -> Self {
        DataFilter {
            data_type: data_type.into(),
            items: Vec::new(),
            offset: None,
            range: None,
        }
    }

    /// Builder: set the claimed items
    pub fn with_items(mut self, items: Vec<FilterItem>) -> Self {
        self.items = items;
        self
    }

    /// Builder: page through the candidate set
    pub fn with_paging(mut self, offset: i32, range: i32) -> Self {
        self.offset = Some(offset);
        self.range = Some(range);
        self
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    pub fn offset(&self) -> Option<i32> {
        self.offset
    }

    pub fn range(&self) -> Option<i32> {
        self.range
    }

    /// Claims as a lookup map for the store's candidate selection
    pub fn claims(&self) -> HashMap<EntryHash, i64> {
        self.items
            .iter()
            .map(|item| (item.hash, item.sequence_number))
            .collect()
    }
}
