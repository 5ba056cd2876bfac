use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Source files known to be permanently unusable (e.g. rejected quality).
///
/// An entry keeps the timestamp of the first rejection; eviction after the
/// rolling-window TTL makes corrected upstream data eligible again.
#[derive(Debug, Default)]
pub struct PoisonCache {
    entries: DashMap<PathBuf, DateTime<Utc>>,
}

impl PoisonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: re-marking keeps the first-failure timestamp.
    pub fn mark(&self, source: &Path) {
        self.mark_at(source, Utc::now());
    }

    fn mark_at(&self, source: &Path, at: DateTime<Utc>) {
        self.entries.entry(source.to_path_buf()).or_insert(at);
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.entries.contains_key(source)
    }

    /// Remove entries marked before `now - ttl`.
    pub fn evict_older_than(&self, ttl: Duration) {
        self.evict_older_than_at(ttl, Utc::now());
    }

    fn evict_older_than_at(&self, ttl: Duration, now: DateTime<Utc>) {
        let cutoff = now - ttl;
        self.entries.retain(|_, marked| *marked >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
