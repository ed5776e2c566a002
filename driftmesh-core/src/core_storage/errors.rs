//! Error types for the data store

use crate::core_crypto::EntryHash;
use thiserror::Error;

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by data store mutations and inventory queries
///
/// Sequence conflicts are an expected, frequent condition on a gossiping
/// network (peers are often behind) and must not be treated as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Signature does not verify against the embedded public key
    #[error("invalid signature")]
    InvalidSignature,

    /// Payload exceeds the data type's size limit
    #[error("payload size {size} exceeds limit {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Payload data type does not match the store's metadata
    #[error("data type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Sequence number is not the expected successor
    #[error("sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: i64, got: i64 },

    /// No entry stored for the hash
    #[error("no entry for hash {0}")]
    NoEntry(EntryHash),

    /// The hash is tombstoned; refreshes and re-adds are rejected
    #[error("entry already removed")]
    AlreadyRemoved,

    /// Signer public key does not match the original entry's signer
    #[error("signer does not match original entry")]
    SignerMismatch,

    /// The store map has reached its size bound
    #[error("store map size limit {0} reached")]
    MaxMapSizeReached(usize),

    /// Filter offset/range request is out of bounds
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// No store registered for the requested data type
    #[error("unknown data type: {0}")]
    UnknownDataType(String),
}
