//! Eviction Scanner
//!
//! Frees slots for an impending insert by walking the ledger from the head
//! and reclaiming tombstones and expired items. The walk is bounded: it gives
//! up once the non-reclaimable entries it has passed exceed
//! `eviction_fail_factor × count`, so a mostly-live ledger costs about
//! `(factor + 1) × count` steps instead of a full scan.

use std::hash::Hash;

use tracing::debug;

use crate::cache::hooks::RemovalCause;
use crate::cache::store::{OrderedStore, SlotState};
use crate::error::Result;

impl<K, V> OrderedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Evict ==
    /// Tries to reclaim `count` ledger entries.
    ///
    /// Returns the number of entries reclaimed; tombstones count even though
    /// they free no item. Reclaimed positions go in a single compaction.
    pub(crate) fn evict(&mut self, count: usize) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }
        let now = self.now();
        let fail_budget = count.saturating_mul(self.settings.eviction_fail_factor);
        let mut positions = Vec::new();
        let mut expired = Vec::new();
        let mut failures = 0;

        for (position, slot) in self.ledger.iter().enumerate() {
            if positions.len() >= count || failures > fail_budget {
                break;
            }
            match self.classify(slot, now) {
                SlotState::Live(_) => failures += 1,
                SlotState::Expired => {
                    expired.push(slot.key.clone());
                    positions.push(position);
                }
                SlotState::Tombstone => positions.push(position),
            }
        }

        for key in &expired {
            self.discard(key, RemovalCause::Expired);
        }
        self.ledger.compact(&positions)?;

        debug!(
            requested = count,
            reclaimed = positions.len(),
            expired = expired.len(),
            failures,
            "eviction scan finished"
        );
        Ok(positions.len())
    }
}
