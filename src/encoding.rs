//! Record encoding.
//!
//! - Node ids map to fixed-width big-endian store keys, so the store's key
//!   order is id order.
//! - Node records are JSON objects: field-tagged, order independent, and
//!   tolerant of absent optional fields.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};

/// Width of a store key in bytes.
pub const KEY_LEN: usize = 4;

/// Encode a node id as its store key.
#[inline]
pub fn id_key(id: NodeId) -> [u8; KEY_LEN] {
    id.to_be_bytes()
}

/// Decode a store key back into a node id.
///
/// Returns `None` for keys that are not exactly [`KEY_LEN`] bytes.
#[inline]
pub fn id_from_key(key: &[u8]) -> Option<NodeId> {
    let bytes: [u8; KEY_LEN] = key.try_into().ok()?;
    Some(NodeId::from_be_bytes(bytes))
}

/// Serialize a node into its record bytes.
pub fn encode_node(node: &Node) -> Result<Vec<u8>> {
    serde_json::to_vec(node).map_err(|source| Error::Encode { id: node.id, source })
}

/// Deserialize the record stored under `id`.
///
/// Bytes that do not decode, or that decode to a node claiming some other id,
/// are reported as errors rather than defaulted.
pub fn decode_node(id: NodeId, bytes: &[u8]) -> Result<Node> {
    let node: Node = serde_json::from_slice(bytes).map_err(|source| Error::Decode { id, source })?;
    if node.id != id {
        return Err(Error::IdMismatch {
            expected: id,
            found: node.id,
        });
    }
    Ok(node)
}

/// Compute the shared prefix length between two byte slices.
#[inline]
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
