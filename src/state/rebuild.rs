use std::collections::HashSet;
use std::hash::Hash;
use std::mem;
use std::sync::Mutex;

/// Set of unique (channel, bucket) keys pending (re)build for one tier.
///
/// Keys arrive from both live propagation and the freshness sweep; inserting
/// an existing key is a no-op, so a bucket collapses to exactly one dispatch.
/// `drain` is atomic: a key inserted concurrently lands in the next drain,
/// never lost.
#[derive(Debug)]
pub struct RebuildSet<K> {
    pending: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash> RebuildSet<K> {
    pub fn new() -> Self {
        RebuildSet {
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Returns true if the key was not already pending.
    pub fn insert(&self, key: K) -> bool {
        self.pending.lock().unwrap().insert(key)
    }

    /// Take everything pending, leaving the set empty.
    pub fn drain(&self) -> Vec<K> {
        mem::take(&mut *self.pending.lock().unwrap())
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty()
    }
}

impl<K: Eq + Hash> Default for RebuildSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
