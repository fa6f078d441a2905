//! Volatile store backed by a `BTreeMap`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Store;
use crate::error::StoreError;

/// In-memory ordered store.
///
/// Clones share the same map, so a trie can be closed and reopened on a clone
/// to simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Store for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.inner.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn last_key(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.read().keys().next_back().cloned())
    }
}
