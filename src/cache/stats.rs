//! Cache Statistics Module
//!
//! Counters for lookups, removals by cause and loader outcomes.

use serde::Serialize;

use crate::cache::hooks::RemovalCause;

// == Cache Stats ==
/// Snapshot of cache activity since construction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups, dequeues and peeks that found a live item
    pub hits: u64,
    /// Lookups, dequeues and peeks that came back empty
    pub misses: u64,
    /// Items dropped because they expired
    pub expired: u64,
    /// Items dropped by an explicit remove
    pub removed: u64,
    /// Items handed out by a dequeue
    pub dequeued: u64,
    pub loads: u64,
    /// Loads whose loader failed or whose value could not be stored
    pub load_failures: u64,
    /// Indexed items at snapshot time, expired ones not yet reclaimed included
    pub indexed_items: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        let requests = self.hits + self.misses;
        if requests == 0 {
            return 0.0;
        }
        self.hits as f64 / requests as f64
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_removal(&mut self, cause: RemovalCause) {
        match cause {
            RemovalCause::Expired => self.expired += 1,
            RemovalCause::Removed => self.removed += 1,
            RemovalCause::Dequeued => self.dequeued += 1,
        }
    }

    pub(crate) fn record_load(&mut self, succeeded: bool) {
        if succeeded {
            self.loads += 1;
        } else {
            self.load_failures += 1;
        }
    }
}
