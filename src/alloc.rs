//! Node id allocation.
//!
//! One atomic counter holds the last id handed out. Before the writer hands
//! new ids to records it reserves a block of them on the root record, so
//! the persisted watermark is always at or above any id a stored record can
//! reference, including ids whose own record never got written. Reopening
//! seeds the counter from that watermark (or from the highest record
//! actually present, whichever is larger). Closing swaps the counter for a
//! sentinel, so a racing `next()` either completes before the close or
//! observes it; it can never hand out an id the flush misses.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, ROOT_ID};
use crate::record::RecordStore;
use crate::store::Store;

/// Counter value once the allocator is closed. Never issued as an id.
const CLOSED: NodeId = NodeId::MAX;

/// Extra ids reserved on the root each time the reservation runs out.
pub const RESERVE_BLOCK: NodeId = 64;

/// Issues strictly increasing, never reused node ids.
#[derive(Debug)]
pub struct IdAllocator {
    /// Last issued id, or [`CLOSED`].
    last: AtomicU32,
    /// Watermark as currently persisted on the root.
    persisted: AtomicU32,
}

impl IdAllocator {
    /// Resume issuing after `last`, treating `persisted` as the stored mark.
    pub fn resume(last: NodeId, persisted: NodeId) -> Self {
        debug_assert!(last >= persisted);
        Self {
            last: AtomicU32::new(last),
            persisted: AtomicU32::new(persisted),
        }
    }

    /// Seed from `root.watermark` and the highest id present in the store.
    ///
    /// The second source covers stores whose root mark lags their records.
    pub fn open<S: Store>(records: &RecordStore<S>, root: &Node) -> Result<Self> {
        let highest = records.highest_id()?.unwrap_or(ROOT_ID);
        let seed = root.watermark.max(highest);
        if seed > root.watermark {
            info!(watermark = root.watermark, seed, "recovered id watermark from stored records");
        }
        Ok(Self::resume(seed, root.watermark))
    }

    /// Make sure the next `count` ids are covered by the persisted watermark.
    ///
    /// Writes the root only when the current reservation runs out, and then
    /// reserves [`RESERVE_BLOCK`] more than asked. Must run before the ids
    /// are referenced by any written record, and before the caller reads a
    /// root it intends to write back.
    pub fn reserve<S: Store>(&self, records: &RecordStore<S>, count: NodeId) -> Result<()> {
        let last = self.last_issued()?;
        let needed = last.checked_add(count).filter(|&n| n < CLOSED).ok_or(Error::IdsExhausted)?;
        if needed <= self.persisted.load(Ordering::Acquire) {
            return Ok(());
        }
        let mark = needed.saturating_add(RESERVE_BLOCK).min(CLOSED - 1);
        let mut root = records.get(ROOT_ID)?.ok_or(Error::MissingRoot)?;
        root.watermark = mark;
        records.put(&root)?;
        self.persisted.store(mark, Ordering::Release);
        debug!(last, watermark = mark, "reserved node ids");
        Ok(())
    }

    /// Next unused id.
    pub fn next(&self) -> Result<NodeId> {
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| match last.checked_add(1) {
                Some(next) if next != CLOSED => Some(next),
                _ => None,
            }) {
            Ok(prev) => {
                let id = prev + 1;
                debug!(id, "allocated node id");
                Ok(id)
            }
            Err(CLOSED) => Err(Error::AllocatorClosed),
            Err(_) => Err(Error::IdsExhausted),
        }
    }

    /// Last id handed out (the seed if none were issued this session).
    pub fn last_issued(&self) -> Result<NodeId> {
        match self.last.load(Ordering::Acquire) {
            CLOSED => Err(Error::AllocatorClosed),
            last => Ok(last),
        }
    }

    /// Watermark currently stored on the root record.
    pub fn persisted(&self) -> NodeId {
        self.persisted.load(Ordering::Acquire)
    }

    /// Stop issuing ids and persist the exact watermark on the root record.
    ///
    /// Returns the last issued id. Nothing is written when the persisted mark
    /// already equals it. An unused reservation is given back here.
    pub fn close<S: Store>(&self, records: &RecordStore<S>) -> Result<NodeId> {
        let last = self.last.swap(CLOSED, Ordering::AcqRel);
        if last == CLOSED {
            return Err(Error::AllocatorClosed);
        }
        if last != self.persisted.load(Ordering::Acquire) {
            let mut root = records.get(ROOT_ID)?.ok_or(Error::MissingRoot)?;
            root.watermark = last;
            records.put(&root)?;
            self.persisted.store(last, Ordering::Release);
        }
        info!(watermark = last, "id allocator closed");
        Ok(last)
    }
}
