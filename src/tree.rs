//! The trie engine: descent, insertion, and traversal over stored records.
//!
//! Every operation reads the records it needs, works on owned copies, and
//! writes complete records back. Nothing is cached between calls, so the
//! store is the only source of truth.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::alloc::IdAllocator;
use crate::encoding::{common_prefix_len, encode_node};
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, ROOT_ID};
use crate::record::RecordStore;
use crate::store::{RedbStore, Store};
use crate::Config;

/// A key together with every value stored under it.
pub type Entry = (Vec<u8>, Vec<String>);

/// Where a descent stopped.
struct Descent {
    node: Node,
    /// Node the descent arrived from. `None` if it never left the start node.
    parent: Option<Node>,
    matched: usize,
}

/// A persistent PATRICIA trie.
///
/// One writer at a time: [`Tree::insert`] takes `&mut self`. Reads take
/// `&self` but see no snapshot; they observe whatever records the store holds.
pub struct Tree<S: Store = RedbStore> {
    records: RecordStore<S>,
    ids: IdAllocator,
}

impl<S: Store + std::fmt::Debug> std::fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("records", &self.records)
            .field("ids", &self.ids)
            .finish()
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

impl Tree<RedbStore> {
    /// Open (or create) a trie stored in the redb database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &Config::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let store = RedbStore::open_with_config(path, config)?;
        Self::with_store(store)
    }
}

impl<S: Store> Tree<S> {
    /// Open a trie over an arbitrary store, creating the root record if absent.
    pub fn with_store(store: S) -> Result<Self> {
        let records = RecordStore::new(store);
        let root = match records.get(ROOT_ID)? {
            Some(root) => root,
            None => {
                let root = Node::root();
                records.put(&root)?;
                info!("created root record");
                root
            }
        };
        let ids = IdAllocator::open(&records, &root)?;
        info!(watermark = root.watermark, "opened tree");
        Ok(Self { records, ids })
    }

    /// Persist the id watermark and release the store.
    ///
    /// Returns the watermark, i.e. the last id ever issued.
    pub fn close(self) -> Result<NodeId> {
        let watermark = self.ids.close(&self.records)?;
        self.records.into_inner().close()?;
        Ok(watermark)
    }

    /// Highest id issued so far, including earlier process lifetimes.
    pub fn last_issued_id(&self) -> Result<NodeId> {
        self.ids.last_issued()
    }

    pub fn root(&self) -> Result<Node> {
        self.records.get(ROOT_ID)?.ok_or(Error::MissingRoot)
    }

    pub fn node(&self, id: NodeId) -> Result<Option<Node>> {
        self.records.get(id)
    }
}

// =============================================================================
// Lookup
// =============================================================================

impl<S: Store> Tree<S> {
    /// Fetch the child of `node` whose edge label starts with `byte`.
    ///
    /// A dangling child id is not an error: the branch is simply absent. So
    /// is a child whose edge does not start with `byte`; an insert through
    /// that branch relinks it.
    fn child(&self, node: &Node, byte: u8) -> Result<Option<Node>> {
        let Some(id) = node.child(byte) else {
            return Ok(None);
        };
        let Some(child) = self.records.get(id)? else {
            warn!(parent = node.id, child = id, "child record missing, treating branch as absent");
            return Ok(None);
        };
        if child.edge_label.first() != Some(&byte) {
            warn!(
                parent = node.id,
                child = id,
                byte,
                "child edge does not start with its link byte, treating branch as absent"
            );
            return Ok(None);
        }
        Ok(Some(child))
    }

    fn descend(&self, start: &Node, search: &[u8], matched: usize) -> Result<Descent> {
        let mut at = Descent {
            node: start.clone(),
            parent: None,
            matched,
        };
        loop {
            let rest = search.get(at.matched..).unwrap_or_default();
            let m = common_prefix_len(&at.node.edge_label, rest);
            at.matched += m;
            if at.matched < search.len() && m == at.node.edge_label.len() {
                if let Some(child) = self.child(&at.node, search[at.matched])? {
                    at.parent = Some(std::mem::replace(&mut at.node, child));
                    continue;
                }
            }
            return Ok(at);
        }
    }

    /// Longest-prefix descent from `start`.
    ///
    /// `matched` counts the bytes of `search` consumed above `start` (0 when
    /// starting from the root); `start`'s edge label is compared against the
    /// rest. Returns the deepest node reachable by whole-edge matches (or the
    /// node where matching ran out partway through its edge) and the total
    /// number of bytes matched. Compare the count against the node's path
    /// length to tell an exact hit from a closest ancestor.
    pub fn lookup(&self, start: &Node, search: &[u8], matched: usize) -> Result<(Node, usize)> {
        let Descent { node, matched, .. } = self.descend(start, search, matched)?;
        Ok((node, matched))
    }

    /// Values stored under exactly `key`, if any.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<String>>> {
        let key = key.as_ref();
        let Descent { node, .. } = self.descend(&self.root()?, key, 0)?;
        Ok((node.path == key && !node.values.is_empty()).then_some(node.values))
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

// =============================================================================
// Insert
// =============================================================================

impl<S: Store> Tree<S> {
    /// Append `value` to the values stored under `key`.
    ///
    /// Returns the id of the node now holding `value`.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: impl Into<String>) -> Result<NodeId> {
        let key = key.as_ref();
        let value = value.into();
        let root = self.root()?;
        let Descent {
            mut node,
            parent,
            matched,
        } = self.descend(&root, key, 0)?;

        if node.path == key {
            debug!(id = node.id, "insert: exact match");
            node.values.push(value);
            self.records.put(&node)?;
            return Ok(node.id);
        }

        match parent {
            _ if matched == node.path.len() => self.extend(node, key, value),
            Some(parent) => self.split(parent, node, key, matched, value),
            None => unreachable!("descent from the root stopped mid-edge without leaving the root"),
        }
    }

    /// Reserve `count` ids on the root before any record may reference them.
    ///
    /// When `parent` is the root its copy picks up the new watermark, so
    /// writing it back does not undo the reservation.
    fn reserve(&self, parent: &mut Node, count: NodeId) -> Result<()> {
        self.ids.reserve(&self.records, count)?;
        if parent.is_root() {
            parent.watermark = self.ids.persisted();
        }
        Ok(())
    }

    /// Hang a new leaf for `key` below `parent`, whose path is a proper prefix of `key`.
    fn extend(&mut self, mut parent: Node, key: &[u8], value: String) -> Result<NodeId> {
        if key.len() <= parent.path.len() {
            return Err(Error::Inconsistent {
                id: parent.id,
                detail: "stored path is not a proper prefix of the key that reached it",
            });
        }
        self.reserve(&mut parent, 1)?;
        let id = self.ids.next()?;
        let child = Node::leaf(id, parent.id, &key[parent.path.len()..], key, value);
        parent.link(&child);
        if parent.is_root() {
            debug!(id, "insert: new child of root");
        } else {
            debug!(parent = parent.id, id, "insert: extension");
        }

        // Child first: if the parent write fails the child is merely unreachable.
        self.records.put(&child)?;
        self.records.put(&parent)?;
        Ok(id)
    }

    /// Split `node` at `matched`, the point where `key` diverges from its edge.
    ///
    /// The mid node takes over `node`'s id and position under `parent`. The
    /// old contents move to a new left node, so left's descendants keep their
    /// records untouched.
    fn split(
        &mut self,
        mut parent: Node,
        node: Node,
        key: &[u8],
        matched: usize,
        value: String,
    ) -> Result<NodeId> {
        if matched <= parent.path.len() {
            return Err(Error::Inconsistent {
                id: node.id,
                detail: "split point does not lie below the parent",
            });
        }
        let new_ids = if key.len() == matched { 1 } else { 2 };
        self.reserve(&mut parent, new_ids)?;

        let common = &key[..matched];
        let Node {
            id,
            path,
            edge_label: old_edge,
            values,
            children,
            ..
        } = node;

        let mut mid = Node {
            id,
            path: common.to_vec(),
            edge_label: common[parent.path.len()..].to_vec(),
            values: Vec::new(),
            children: BTreeMap::new(),
            parent_id: parent.id,
            watermark: 0,
        };
        let left = Node {
            id: self.ids.next()?,
            edge_label: path[matched..].to_vec(),
            path,
            values,
            children,
            parent_id: mid.id,
            watermark: 0,
        };
        mid.link(&left);

        let right = if key.len() == matched {
            mid.values.push(value);
            None
        } else {
            let right = Node::leaf(self.ids.next()?, mid.id, &key[matched..], key, value);
            mid.link(&right);
            Some(right)
        };
        let holder = right.as_ref().map_or(mid.id, |right| right.id);

        if old_edge.first() != mid.edge_label.first() {
            if let Some(&byte) = old_edge.first() {
                parent.children.remove(&byte);
            }
        }
        parent.link(&mid);

        debug!(
            parent = parent.id,
            mid = mid.id,
            left = left.id,
            right = ?right.as_ref().map(|right| right.id),
            "insert: split"
        );

        let mut writes: SmallVec<[(NodeId, Vec<u8>); 4]> = SmallVec::new();
        for record in [&parent, &mid, &left].into_iter().chain(right.as_ref()) {
            writes.push((record.id, encode_node(record)?));
        }

        let total = writes.len();
        for (written, (record_id, bytes)) in writes.iter().enumerate() {
            if let Err(source) = self.records.put_encoded(*record_id, bytes) {
                if written == 0 {
                    return Err(source.into());
                }
                warn!(node = id, written, total, error = %source, "split partially applied");
                return Err(Error::PartialSplit {
                    node: id,
                    written,
                    total,
                    source,
                });
            }
        }
        Ok(holder)
    }
}

// =============================================================================
// Traversal
// =============================================================================

impl<S: Store> Tree<S> {
    /// Depth-first walk below `node`, calling `visit(key, values)`.
    ///
    /// `prefix` is the key `node` stands for; each child's key is `prefix`
    /// plus its edge label. Leaves are always visited. Inner nodes are
    /// visited after their children, and only when they store values.
    /// Children go in ascending first-byte order.
    pub fn traverse<F>(&self, node: &Node, prefix: &[u8], visit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8], &[String]),
    {
        if node.is_leaf() {
            visit(prefix, &node.values);
            return Ok(());
        }

        let mut key = prefix.to_vec();
        for &byte in node.children.keys() {
            let Some(child) = self.child(node, byte)? else {
                continue;
            };
            key.truncate(prefix.len());
            key.extend_from_slice(&child.edge_label);
            self.traverse(&child, &key, visit)?;
        }

        if !node.values.is_empty() {
            visit(prefix, &node.values);
        }
        Ok(())
    }

    /// Every stored key with its values.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let root = self.root()?;
        self.collect(&root, &[])
    }

    /// Stored keys starting with `prefix`.
    pub fn scan_prefix(&self, prefix: impl AsRef<[u8]>) -> Result<Vec<Entry>> {
        let prefix = prefix.as_ref();
        let Descent { node, matched, .. } = self.descend(&self.root()?, prefix, 0)?;
        // Matching ran out before the prefix did: nothing below can match.
        if matched < prefix.len() {
            return Ok(Vec::new());
        }
        self.collect(&node, &node.path)
    }

    fn collect(&self, node: &Node, prefix: &[u8]) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        self.traverse(node, prefix, &mut |key, values| {
            if !values.is_empty() {
                out.push((key.to_vec(), values.to_vec()));
            }
        })?;
        Ok(out)
    }

    /// Write an indented rendering of the trie, one node per line.
    pub fn dump<W: io::Write>(&self, out: &mut W) -> Result<()> {
        let root = self.root()?;
        self.dump_node(&root, 0, out)
    }

    fn dump_node<W: io::Write>(&self, node: &Node, depth: usize, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "{:indent$}{:?} {:?} #{}",
            "",
            String::from_utf8_lossy(&node.edge_label),
            node.values,
            node.id,
            indent = depth * 2
        )?;
        for &id in node.children.values() {
            match self.records.get(id)? {
                Some(child) => self.dump_node(&child, depth + 1, out)?,
                None => writeln!(out, "{:indent$}<missing #{id}>", "", indent = (depth + 1) * 2)?,
            }
        }
        Ok(())
    }
}
