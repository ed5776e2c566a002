/*
    Entry - signed envelopes for replicated mutations

    Responsibilities:
    `entry.rs` defines the wire-level envelopes that carry store mutations
    between peers: AddEntry (payload + ownership proof), RefreshEntry
    (TTL bump without re-sending the payload) and RemoveEntry (tombstone).
    Each envelope is signed by the entry owner over a domain-separated
    preimage of (hash, sequence number, creation time), so a refresh can
    advance a stored add's sequence number while keeping it
    signature-valid for re-emission in inventory responses.

    Inputs:
    - payloads and keypairs from the local node
    - envelopes received from remote peers

    Outputs:
    - verified mutations consumed by the data store
*/

use crate::core_crypto::{EntryHash, Keypair};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Domain prefix for live-data signatures (adds and refreshes)
const DATA_SIGN_PREFIX: &[u8] = b"DM_DATA";

/// Domain prefix for tombstone signatures
const TOMB_SIGN_PREFIX: &[u8] = b"DM_TOMB";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Signing preimage shared by adds and refreshes
fn data_preimage(hash: &EntryHash, sequence_number: i64, created_at: i64) -> Vec<u8> {
    sign_preimage(DATA_SIGN_PREFIX, hash, sequence_number, created_at)
}

/// Signing preimage for tombstones
fn tomb_preimage(hash: &EntryHash, sequence_number: i64, created_at: i64) -> Vec<u8> {
    sign_preimage(TOMB_SIGN_PREFIX, hash, sequence_number, created_at)
}

fn sign_preimage(prefix: &[u8], hash: &EntryHash, sequence_number: i64, created_at: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + 32 + 16);
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(hash.as_bytes());
    buf.extend_from_slice(&sequence_number.to_le_bytes());
    buf.extend_from_slice(&created_at.to_le_bytes());
    buf
}

/// Application payload carried by an AddEntry
///
/// The data type name is part of the hashed bytes, so the same raw data
/// published under two types yields two distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Registered data type name
    data_type: String,
    /// Opaque application bytes
    data: Vec<u8>,
}

impl Payload {
    pub fn new(data_type: impl Into<String>, data: Vec<u8>) -> Self {
        Payload {
            data_type: data_type.into(),
            data,
        }
    }

    /// Content hash keying this payload in the replicated store
    pub fn hash(&self) -> EntryHash {
        let mut buf = Vec::with_capacity(self.data_type.len() + 1 + self.data.len());
        buf.extend_from_slice(self.data_type.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.data);
        EntryHash::digest(&buf)
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serialized size in bytes, checked against the type's payload limit
    pub fn size(&self) -> usize {
        self.data_type.len() + self.data.len()
    }
}

/// Add mutation: publishes (or republishes at a higher sequence) a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEntry {
    payload: Payload,
    sequence_number: i64,
    created_at: i64,
    public_key: Vec<u8>,
    signature: Vec<u8>,
}

impl AddEntry {
    /// Build and sign an add for the given payload and sequence number
    pub fn sign(payload: Payload, sequence_number: i64, keypair: &Keypair) -> Self {
        Self::sign_at(payload, sequence_number, now_millis(), keypair)
    }

    /// Build and sign an add with an explicit creation timestamp
    pub fn sign_at(
        payload: Payload,
        sequence_number: i64,
        created_at: i64,
        keypair: &Keypair,
    ) -> Self {
        let hash = payload.hash();
        let signature = keypair.sign(&data_preimage(&hash, sequence_number, created_at));
        AddEntry {
            payload,
            sequence_number,
            created_at,
            public_key: keypair.public_key().to_vec(),
            signature,
        }
    }

    /// Verify the owner signature over the envelope
    pub fn verify(&self) -> bool {
        let preimage = data_preimage(&self.hash(), self.sequence_number, self.created_at);
        Keypair::verify(&self.public_key, &preimage, &self.signature)
    }

    pub fn hash(&self) -> EntryHash {
        self.payload.hash()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Apply a verified refresh: advance the sequence number and adopt the
    /// refresh's timestamp and signature so the stored envelope stays valid
    pub(crate) fn apply_refresh(&mut self, refresh: &RefreshEntry) {
        self.sequence_number = refresh.sequence_number();
        self.created_at = refresh.created_at();
        self.signature = refresh.signature().to_vec();
    }
}

/// Refresh mutation: bumps an entry's sequence number and TTL clock
/// without carrying the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEntry {
    hash: EntryHash,
    sequence_number: i64,
    created_at: i64,
    public_key: Vec<u8>,
    signature: Vec<u8>,
}

impl RefreshEntry {
    pub fn sign(hash: EntryHash, sequence_number: i64, keypair: &Keypair) -> Self {
        Self::sign_at(hash, sequence_number, now_millis(), keypair)
    }

    pub fn sign_at(
        hash: EntryHash,
        sequence_number: i64,
        created_at: i64,
        keypair: &Keypair,
    ) -> Self {
        let signature = keypair.sign(&data_preimage(&hash, sequence_number, created_at));
        RefreshEntry {
            hash,
            sequence_number,
            created_at,
            public_key: keypair.public_key().to_vec(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        let preimage = data_preimage(&self.hash, self.sequence_number, self.created_at);
        Keypair::verify(&self.public_key, &preimage, &self.signature)
    }

    pub fn hash(&self) -> EntryHash {
        self.hash
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// Remove mutation: tombstones an entry so stale re-adds are rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveEntry {
    hash: EntryHash,
    sequence_number: i64,
    created_at: i64,
    public_key: Vec<u8>,
    signature: Vec<u8>,
}

impl RemoveEntry {
    pub fn sign(hash: EntryHash, sequence_number: i64, keypair: &Keypair) -> Self {
        Self::sign_at(hash, sequence_number, now_millis(), keypair)
    }

    pub fn sign_at(
        hash: EntryHash,
        sequence_number: i64,
        created_at: i64,
        keypair: &Keypair,
    ) -> Self {
        let signature = keypair.sign(&tomb_preimage(&hash, sequence_number, created_at));
        RemoveEntry {
            hash,
            sequence_number,
            created_at,
            public_key: keypair.public_key().to_vec(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        let preimage = tomb_preimage(&self.hash, self.sequence_number, self.created_at);
        Keypair::verify(&self.public_key, &preimage, &self.signature)
    }

    pub fn hash(&self) -> EntryHash {
        self.hash
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Any mutation envelope, as carried in inventory responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    Add(AddEntry),
    Refresh(RefreshEntry),
    Remove(RemoveEntry),
}

impl Entry {
    pub fn hash(&self) -> EntryHash {
        match self {
            Entry::Add(e) => e.hash(),
            Entry::Refresh(e) => e.hash(),
            Entry::Remove(e) => e.hash(),
        }
    }

    pub fn sequence_number(&self) -> i64 {
        match self {
            Entry::Add(e) => e.sequence_number(),
            Entry::Refresh(e) => e.sequence_number(),
            Entry::Remove(e) => e.sequence_number(),
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            Entry::Add(e) => e.created_at(),
            Entry::Refresh(e) => e.created_at(),
            Entry::Remove(e) => e.created_at(),
        }
    }

    pub fn verify(&self) -> bool {
        match self {
            Entry::Add(e) => e.verify(),
            Entry::Refresh(e) => e.verify(),
            Entry::Remove(e) => e.verify(),
        }
    }
}
