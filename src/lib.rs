//! # patricia-store
//!
//! A persistent PATRICIA (radix) trie. Each trie node is one record in an
//! ordered key-value store, addressed by a 32-bit id instead of a pointer.
//!
//! ## Features
//!
//! - **Multi-valued keys**: every key maps to an ordered list of values
//! - **Longest-prefix lookup**: descent reports the closest node and how much
//!   of the key it matched
//! - **Cheap splits**: a split writes at most four records, however large the
//!   subtree below the split point is
//! - **Restart-safe ids**: ids are reserved on the root before any record
//!   references them, so they are never reused, even after an unclean shutdown
//!
//! ## Architecture
//!
//! 1. **Store** ([`store`]): byte keys to byte values with point get/put.
//!    [`RedbStore`] keeps records on disk, [`MemStore`] in memory.
//! 2. **Records** ([`record`], [`encoding`]): nodes encoded as JSON records
//!    under 4-byte big-endian id keys.
//! 3. **Ids** ([`alloc`]): an atomic counter backed by a block reservation
//!    kept on the root record.
//! 4. **Trie** ([`tree`]): lookup, insert (exact / extend / split), and
//!    traversal.
//!
//! The store gives no multi-key atomicity. An insert that fails halfway
//! through a split is reported as [`Error::PartialSplit`] and is not rolled
//! back.
//!
//! ## Example
//!
//! ```rust
//! use patricia_store::{MemStore, Tree};
//!
//! let mut tree = Tree::with_store(MemStore::new()).unwrap();
//! tree.insert("apple", "1").unwrap();
//! tree.insert("app", "2").unwrap();
//! tree.insert("apply", "3").unwrap();
//!
//! assert_eq!(tree.get("app").unwrap(), Some(vec!["2".to_string()]));
//!
//! let root = tree.root().unwrap();
//! let (closest, matched) = tree.lookup(&root, b"applesauce", 0).unwrap();
//! assert_eq!(closest.path, b"apple");
//! assert_eq!(matched, 5);
//!
//! for (key, values) in tree.scan_prefix("appl").unwrap() {
//!     println!("{} -> {:?}", String::from_utf8_lossy(&key), values);
//! }
//! tree.close().unwrap();
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod alloc;
pub mod encoding;
pub mod error;
pub mod node;
pub mod record;
pub mod store;
pub mod tree;

pub use alloc::IdAllocator;
pub use error::{Error, Result, StoreError};
pub use node::{Node, NodeId, ROOT_ID};
pub use record::RecordStore;
pub use store::{MemStore, RedbStore, Store};
pub use tree::{Entry, Tree};

/// Configuration for opening an on-disk trie.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page cache size handed to redb, in bytes
    pub cache_size: usize,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_size: 64 * 1024 * 1024,
            create_if_missing: true,
        }
    }
}



#[cfg(test)]
mod proptests;
