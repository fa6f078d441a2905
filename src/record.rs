//! Record store adapter: nodes in, nodes out.

use tracing::trace;

use crate::encoding::{decode_node, encode_node, id_from_key, id_key};
use crate::error::{Result, StoreError};
use crate::node::{Node, NodeId};
use crate::store::Store;

/// Typed view over a byte [`Store`].
///
/// Errors from the store pass through unchanged. Retries, if any, are the
/// store's business.
#[derive(Debug)]
pub struct RecordStore<S> {
    store: S,
}

impl<S: Store> RecordStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetch and decode the node stored under `id`.
    pub fn get(&self, id: NodeId) -> Result<Option<Node>> {
        let Some(bytes) = self.store.get(&id_key(id))? else {
            trace!(id, "record not found");
            return Ok(None);
        };
        trace!(id, len = bytes.len(), "record read");
        decode_node(id, &bytes).map(Some)
    }

    /// Encode and write `node` under its own id.
    pub fn put(&self, node: &Node) -> Result<()> {
        let bytes = encode_node(node)?;
        self.put_encoded(node.id, &bytes)?;
        Ok(())
    }

    /// Write an already encoded record.
    ///
    /// Split logic encodes its whole write set up front and then only has
    /// store failures left to deal with.
    pub fn put_encoded(&self, id: NodeId, bytes: &[u8]) -> std::result::Result<(), StoreError> {
        trace!(id, len = bytes.len(), "record write");
        self.store.put(&id_key(id), bytes)
    }

    /// Highest node id with a record in the store.
    pub fn highest_id(&self) -> Result<Option<NodeId>> {
        Ok(self.store.last_key()?.as_deref().and_then(id_from_key))
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
