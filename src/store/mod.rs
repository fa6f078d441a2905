//! Ordered byte-key store the trie persists its nodes into.
//!
//! The trie only needs single-key atomic point reads and writes. There are no
//! multi-key transactions at this boundary, so a multi-record insert can be
//! interrupted between writes.

mod disk;
mod memory;

pub use self::disk::RedbStore;
pub use self::memory::MemStore;

use crate::error::StoreError;

/// Byte-key to byte-value storage with point get/put.
pub trait Store {
    /// Read the value stored under `key`. `Ok(None)` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Greatest key currently stored, in byte order.
    fn last_key(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Release the store. No further operations are valid.
    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        Ok(())
    }
}
