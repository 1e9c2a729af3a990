//! Typed errors for graph construction and queries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A build phase was invoked on a graph opened read-only.
    #[error("graph is read-only; build phases require a writable graph")]
    ReadOnly,

    /// The conditional-access bitset and the sorted restriction table
    /// disagree. This is a construction bug, not a query miss.
    #[error("access restriction for way {osm_way} flagged but not found in table")]
    AccessEntryMissing { osm_way: i64 },

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("bad blob magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported blob version {0}")]
    BadVersion(u16),

    #[error("blob checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("blob is truncated")]
    Truncated,

    #[error("blob encoding error: {0}")]
    Codec(#[from] bincode::Error),
}
