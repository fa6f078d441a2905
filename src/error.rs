//! Error types for the trie and its record store.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`crate::store::Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// redb database, transaction, table, or commit failure.
    #[error("redb: {0}")]
    Redb(#[from] redb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Lift any of redb's per-operation error types into a [`StoreError`].
    pub(crate) fn redb(e: impl Into<redb::Error>) -> Self {
        StoreError::Redb(e.into())
    }
}

/// Trie error.
///
/// A missing record is not an error: lookups yield `None` or the closest
/// ancestor instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying store failed. Never retried.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to encode node {id}: {source}")]
    Encode {
        id: NodeId,
        #[source]
        source: serde_json::Error,
    },

    /// The record bytes do not decode to a node. Indicates corruption.
    #[error("record for node {id} is corrupt: {source}")]
    Decode {
        id: NodeId,
        #[source]
        source: serde_json::Error,
    },

    /// A record stored under one id claims a different one.
    #[error("record stored under node {expected} claims id {found}")]
    IdMismatch { expected: NodeId, found: NodeId },

    #[error("root record is missing")]
    MissingRoot,

    /// Stored records contradict each other where an insert needs them to
    /// agree. The insert is refused before anything is written.
    #[error("node {id} is inconsistent with the trie above it: {detail}")]
    Inconsistent { id: NodeId, detail: &'static str },

    /// A split failed after some of its records were written.
    ///
    /// Nothing is rolled back: the parent may point at a half-built mid node,
    /// or left/right records may exist without being reachable.
    #[error("split at node {node} partially applied ({written} of {total} records written): {source}")]
    PartialSplit {
        node: NodeId,
        written: usize,
        total: usize,
        #[source]
        source: StoreError,
    },

    #[error("node id space exhausted")]
    IdsExhausted,

    #[error("id allocator is closed")]
    AllocatorClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the trie may have been left with a half-applied split.
    pub fn is_partial_split(&self) -> bool {
        matches!(self, Error::PartialSplit { .. })
    }
}
