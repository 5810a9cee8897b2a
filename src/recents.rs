//! Bounded, insertion-ordered cache of recently touched artifacts.
//!
//! The cache holds handles, not copies: an entry here is the same
//! instance the schema owns. Enqueueing an artifact that is already
//! present does nothing, so membership is stable until enough *distinct*
//! artifacts arrive to push it out. The cache itself never performs I/O;
//! the binder couples every eviction to a durability flush of the evicted
//! artifact.

use crate::artifact::ArtifactHandle;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct RecentsCache {
    entries: VecDeque<ArtifactHandle>,
    capacity: usize,
}

impl RecentsCache {
    /// A cache holding at most `capacity` artifacts, minimum one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `handle` as most recent. Already-present handles are left
    /// where they are. When the cache would exceed its capacity, the
    /// oldest entry is removed and returned; the caller is responsible
    /// for flushing it before letting it go.
    pub fn enqueue(&mut self, handle: &ArtifactHandle) -> Option<ArtifactHandle> {
        if self.contains(handle) {
            return None;
        }
        self.entries.push_back(handle.clone());
        if self.entries.len() > self.capacity {
            return self.entries.pop_front();
        }
        None
    }

    /// Membership by instance, not by name.
    pub fn contains(&self, handle: &ArtifactHandle) -> bool {
        self.entries.iter().any(|entry| entry.same(handle))
    }

    /// Drop a handle without the eviction flush. Used when the artifact
    /// is being deleted outright.
    pub fn eject(&mut self, handle: &ArtifactHandle) {
        self.entries.retain(|entry| !entry.same(handle));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.entries.iter()
    }

    pub fn handles(&self) -> Vec<ArtifactHandle> {
        self.entries.iter().cloned().collect()
    }
}
