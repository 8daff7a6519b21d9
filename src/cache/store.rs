//! Ordered Store Module
//!
//! Main cache engine: a key→item index paired with an ordered ledger of keys.
//! Removals only touch the index and leave tombstones in the ledger; scans
//! reclaim tombstones and expired items and compact the ledger in one pass.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::cache::clock::Clock;
use crate::cache::entry::{deadline, Item};
use crate::cache::hooks::{CacheListener, ExpiryPredicate, RemovalCause};
use crate::cache::ledger::{Ledger, Slot};
use crate::cache::stats::CacheStats;
use crate::error::{CacheError, Result};

/// Where a new key enters the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Tail, queue order
    Back,
    /// Head, stack order
    Front,
}

/// Policy and hooks a store is built with.
pub(crate) struct StoreSettings<K, V> {
    /// Live item limit, 0 = unbounded
    pub capacity: usize,
    /// Expiration applied on every insert
    pub expiration: Option<Duration>,
    /// Eviction gives up after `factor × requested` non-reclaimable entries
    pub eviction_fail_factor: usize,
    pub listener: Arc<dyn CacheListener<K, V>>,
    pub expiry: Option<Arc<dyn ExpiryPredicate<K>>>,
    pub clock: Arc<dyn Clock>,
}

impl<K, V> StoreSettings<K, V> {
    /// Expired by the dynamic predicate or by the item's own deadline.
    pub fn is_expired(&self, key: &K, item: &Item<V>, now: Instant) -> bool {
        self.expiry
            .as_ref()
            .is_some_and(|predicate| predicate.is_expired(key))
            || item.is_expired(now)
    }
}

/// What a ledger slot currently refers to.
pub(super) enum SlotState<'a, V> {
    Tombstone,
    Expired,
    Live(&'a Item<V>),
}

// == Ordered Store ==
/// Item index plus ordering ledger.
///
/// Invariants:
/// - `items.len() <= ledger.len()`
/// - every item appears exactly once in the ledger as a slot with its stamp
pub(crate) struct OrderedStore<K, V> {
    pub(super) items: HashMap<K, Item<V>>,
    pub(super) ledger: Ledger<K>,
    pub(super) settings: StoreSettings<K, V>,
    pub(super) stats: CacheStats,
    next_stamp: u64,
}

impl<K, V> OrderedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    pub fn new(settings: StoreSettings<K, V>) -> Self {
        let (items, ledger) = if settings.capacity > 0 {
            (
                HashMap::with_capacity(settings.capacity),
                Ledger::with_capacity(settings.capacity),
            )
        } else {
            (HashMap::new(), Ledger::default())
        };
        Self {
            items,
            ledger,
            settings,
            stats: CacheStats::new(),
            next_stamp: 0,
        }
    }

    pub(super) fn now(&self) -> Instant {
        self.settings.clock.now()
    }

    pub(super) fn classify(&self, slot: &Slot<K>, now: Instant) -> SlotState<'_, V> {
        match self.items.get(&slot.key) {
            Some(item) if item.stamp == slot.stamp => {
                if self.settings.is_expired(&slot.key, item, now) {
                    SlotState::Expired
                } else {
                    SlotState::Live(item)
                }
            }
            _ => SlotState::Tombstone,
        }
    }

    fn at_capacity(&self) -> bool {
        self.settings.capacity > 0 && self.items.len() >= self.settings.capacity
    }

    // == Discard ==
    /// Drops the item for `key` from the index, leaving its ledger slot behind
    /// as a tombstone.
    pub(super) fn discard(&mut self, key: &K, cause: RemovalCause) -> Option<V> {
        let item = self.items.remove(key)?;
        self.stats.record_removal(cause);
        self.settings.listener.on_evicted(key, &item.value, cause);
        Some(item.value)
    }

    /// Replaces the value of a live item in place, keeping its position.
    ///
    /// Hands the value back when there is no live item for `key`; an expired
    /// one is discarded first so the caller inserts a fresh item.
    fn try_replace(&mut self, key: &K, value: V, ttl: Option<Duration>, now: Instant) -> Option<V> {
        let expired = match self.items.get(key) {
            None => return Some(value),
            Some(item) => self.settings.is_expired(key, item, now),
        };
        if expired {
            self.discard(key, RemovalCause::Expired);
            return Some(value);
        }
        if let Some(item) = self.items.get_mut(key) {
            item.value = value;
            if let Some(ttl) = ttl {
                item.expire_after(now, ttl);
            }
            self.settings.listener.on_added(key, &item.value);
        }
        None
    }

    /// Indexes a new item and returns the ledger slot the caller must place.
    fn admit(&mut self, key: K, value: V, expires_at: Option<Instant>) -> Slot<K> {
        let stamp = self.next_stamp;
        self.next_stamp = self.next_stamp.wrapping_add(1);
        self.settings.listener.on_added(&key, &value);
        self.items
            .insert(key.clone(), Item::new(value, expires_at, stamp));
        Slot { key, stamp }
    }

    fn capacity_exceeded(&self) -> CacheError {
        warn!(
            capacity = self.settings.capacity,
            "insert rejected, eviction found nothing to reclaim"
        );
        CacheError::CapacityExceeded(self.settings.capacity)
    }

    // == Insert ==
    /// Inserts or replaces `key`.
    ///
    /// A replaced key keeps its ledger position. A new key is placed at the
    /// tail or head; at capacity one slot is reclaimed first.
    ///
    /// # Arguments
    /// * `ttl` - Per-item expiration overriding the configured one
    pub fn insert(
        &mut self,
        key: K,
        value: V,
        placement: Placement,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let now = self.now();
        let ttl = ttl.or(self.settings.expiration);
        let Some(value) = self.try_replace(&key, value, ttl, now) else {
            return Ok(());
        };

        if self.at_capacity() {
            self.evict(1)?;
            if self.at_capacity() {
                return Err(self.capacity_exceeded());
            }
        }

        let slot = self.admit(key, value, ttl.and_then(|ttl| deadline(now, ttl)));
        match placement {
            Placement::Back => self.ledger.push_back(slot),
            Placement::Front => self.ledger.push_front(slot),
        }
        Ok(())
    }

    // == Insert Batch ==
    /// Inserts a batch, reserving space with a single eviction scan.
    ///
    /// New keys enter the ledger as one block after the loop. On failure the
    /// keys inserted before the failing one stay in place.
    pub fn insert_batch(&mut self, entries: Vec<(K, V)>, placement: Placement) -> Result<()> {
        let now = self.now();
        let ttl = self.settings.expiration;
        let total = entries.len();
        let mut reserved = false;
        let mut fresh = Vec::new();
        let mut outcome = Ok(());

        for (index, (key, value)) in entries.into_iter().enumerate() {
            let Some(value) = self.try_replace(&key, value, ttl, now) else {
                continue;
            };
            if self.at_capacity() {
                if !reserved {
                    reserved = true;
                    if let Err(err) = self.evict(total - index) {
                        outcome = Err(err);
                        break;
                    }
                }
                if self.at_capacity() {
                    outcome = Err(self.capacity_exceeded());
                    break;
                }
            }
            fresh.push(self.admit(key, value, ttl.and_then(|ttl| deadline(now, ttl))));
        }

        match placement {
            Placement::Back => self.ledger.append_block(fresh),
            Placement::Front => self.ledger.prepend_block(fresh),
        }
        outcome
    }

    // == Lookup ==
    /// Returns the live value for `key`, discarding it if expired.
    pub fn lookup(&mut self, key: &K) -> Option<V> {
        let now = self.now();
        let live = self.items.get(key).map(|item| {
            (!self.settings.is_expired(key, item, now)).then(|| item.value.clone())
        });
        match live {
            Some(Some(value)) => {
                self.stats.record_hit();
                Some(value)
            }
            Some(None) => {
                self.discard(key, RemovalCause::Expired);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Live value for `key` without touching stats or the index.
    pub fn peek(&self, key: &K) -> Option<V> {
        let item = self.items.get(key)?;
        (!self.settings.is_expired(key, item, self.now())).then(|| item.value.clone())
    }

    // == Dequeue ==
    /// Removes the first live entry, discarding stale and expired entries
    /// in front of it. All visited positions go in one compaction.
    pub fn dequeue(&mut self) -> Result<(K, V)> {
        let now = self.now();
        let mut visited = Vec::new();
        let mut expired = Vec::new();
        let mut head = None;

        for (position, slot) in self.ledger.iter().enumerate() {
            visited.push(position);
            match self.classify(slot, now) {
                SlotState::Live(_) => {
                    head = Some(slot.key.clone());
                    break;
                }
                SlotState::Expired => expired.push(slot.key.clone()),
                SlotState::Tombstone => {}
            }
        }

        for key in &expired {
            self.discard(key, RemovalCause::Expired);
        }
        let popped = head.and_then(|key| {
            let value = self.discard(&key, RemovalCause::Dequeued)?;
            Some((key, value))
        });
        self.ledger.compact(&visited)?;

        match popped {
            Some(pair) => {
                self.stats.record_hit();
                Ok(pair)
            }
            None => {
                self.stats.record_miss();
                Err(CacheError::EmptyQueue)
            }
        }
    }

    // == Dequeue Batch ==
    /// Removes up to `count` live entries from the head, in head-to-tail order.
    ///
    /// When `count` covers the whole ledger every entry is consumed, so the
    /// ledger is cleared instead of compacted.
    pub fn dequeue_batch(&mut self, count: usize) -> Result<Vec<(K, V)>> {
        let now = self.now();
        let drain_all = count >= self.ledger.len();
        let mut visited = Vec::new();
        let mut expired = Vec::new();
        let mut taken = Vec::new();

        for (position, slot) in self.ledger.iter().enumerate() {
            match self.classify(slot, now) {
                SlotState::Live(_) => {
                    if taken.len() >= count {
                        break;
                    }
                    taken.push(slot.key.clone());
                }
                SlotState::Expired => expired.push(slot.key.clone()),
                SlotState::Tombstone => {}
            }
            visited.push(position);
        }

        for key in &expired {
            self.discard(key, RemovalCause::Expired);
        }
        let pairs: Vec<(K, V)> = taken
            .into_iter()
            .filter_map(|key| {
                let value = self.discard(&key, RemovalCause::Dequeued)?;
                Some((key, value))
            })
            .collect();

        if drain_all {
            self.ledger.clear();
        } else {
            self.ledger.compact(&visited)?;
        }

        if pairs.is_empty() {
            self.stats.record_miss();
            Err(CacheError::EmptyQueue)
        } else {
            self.stats.record_hit();
            Ok(pairs)
        }
    }

    // == Peek Top ==
    /// Returns the first live entry without removing it. Stale and expired
    /// entries in front of it are still compacted away.
    pub fn peek_top(&mut self) -> Result<(K, V)> {
        let now = self.now();
        let mut skipped = Vec::new();
        let mut expired = Vec::new();
        let mut top = None;

        for (position, slot) in self.ledger.iter().enumerate() {
            match self.classify(slot, now) {
                SlotState::Live(item) => {
                    top = Some((slot.key.clone(), item.value.clone()));
                    break;
                }
                SlotState::Expired => {
                    expired.push(slot.key.clone());
                    skipped.push(position);
                }
                SlotState::Tombstone => skipped.push(position),
            }
        }

        for key in &expired {
            self.discard(key, RemovalCause::Expired);
        }
        self.ledger.compact(&skipped)?;

        match top {
            Some(pair) => {
                self.stats.record_hit();
                Ok(pair)
            }
            None => {
                self.stats.record_miss();
                Err(CacheError::EmptyQueue)
            }
        }
    }

    // == Move Front ==
    /// Moves `key` to the head unless it already sits within the first
    /// `window` positions.
    pub fn move_front(&mut self, key: &K, window: usize) -> Result<()> {
        let Some(stamp) = self.items.get(key).map(|item| item.stamp) else {
            self.stats.record_miss();
            return Err(CacheError::KeyNotFound);
        };
        let position = self.ledger.position(key, stamp).ok_or_else(|| {
            CacheError::ConsistencyViolation("indexed key has no ledger slot".to_string())
        })?;
        if position >= window {
            self.ledger.move_to_front(position);
        }
        Ok(())
    }

    // == Remove ==
    /// Removes `key`, returning whether it was present.
    ///
    /// The ledger is rebuilt outright when at most one item remains.
    pub fn remove(&mut self, key: &K) -> bool {
        let found = self.discard(key, RemovalCause::Removed).is_some();
        match self.items.len() {
            0 => self.ledger.clear(),
            1 => {
                if let Some((key, item)) = self.items.iter().next() {
                    self.ledger.reset_to(Slot {
                        key: key.clone(),
                        stamp: item.stamp,
                    });
                }
            }
            _ => {}
        }
        found
    }

    // == Remove Expired ==
    /// Reclaims tombstones and expired entries from the head, giving up after
    /// more than `max_failures` consecutive live entries.
    ///
    /// Returns the number of ledger entries reclaimed.
    pub fn remove_expired(&mut self, max_failures: usize) -> Result<usize> {
        let now = self.now();
        let mut failures = 0;
        let mut positions = Vec::new();
        let mut expired = Vec::new();

        for (position, slot) in self.ledger.iter().enumerate() {
            if failures > max_failures {
                break;
            }
            match self.classify(slot, now) {
                SlotState::Live(_) => failures += 1,
                SlotState::Expired => {
                    expired.push(slot.key.clone());
                    positions.push(position);
                    failures = 0;
                }
                SlotState::Tombstone => {
                    positions.push(position);
                    failures = 0;
                }
            }
        }

        for key in &expired {
            self.discard(key, RemovalCause::Expired);
        }
        self.ledger.compact(&positions)?;
        Ok(positions.len())
    }

    // == Sweep ==
    /// Full scan: visits every live entry in ledger order, reclaims the rest
    /// and compacts the ledger once.
    ///
    /// Returns the number of ledger entries reclaimed.
    pub fn sweep<F>(&mut self, mut visit: F) -> Result<usize>
    where
        F: FnMut(&K, &V),
    {
        let now = self.now();
        let mut positions = Vec::new();
        let mut expired = Vec::new();

        for (position, slot) in self.ledger.iter().enumerate() {
            match self.classify(slot, now) {
                SlotState::Live(item) => visit(&slot.key, &item.value),
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
        Ok(positions.len())
    }

    // == Purge ==
    /// Hands every indexed item to the purge callback, then empties the store.
    pub fn purge(&mut self) {
        for slot in self.ledger.iter() {
            if let Some(item) = self.items.get(&slot.key).filter(|item| item.stamp == slot.stamp) {
                self.settings.listener.on_purged(&slot.key, &item.value);
            }
        }
        self.items.clear();
        self.ledger.clear();
    }

    /// Live keys in ledger order, checked without mutating anything.
    pub fn live_keys(&self) -> Vec<K> {
        let now = self.now();
        self.ledger
            .iter()
            .filter(|slot| matches!(self.classify(slot, now), SlotState::Live(_)))
            .map(|slot| slot.key.clone())
            .collect()
    }

    /// Raw ledger snapshot, tombstones included.
    pub fn ordered_keys(&self) -> Vec<K> {
        self.ledger.keys()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn capacity(&self) -> usize {
        self.settings.capacity
    }

    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.indexed_items = self.items.len();
        stats
    }

    /// Verifies both structural invariants.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.items.len() > self.ledger.len() {
            return Err(format!(
                "{} items but only {} ledger entries",
                self.items.len(),
                self.ledger.len()
            ));
        }
        for (key, item) in &self.items {
            let slots = self
                .ledger
                .iter()
                .filter(|slot| slot.stamp == item.stamp && slot.key == *key)
                .count();
            if slots != 1 {
                return Err(format!("item with stamp {} has {} ledger slots", item.stamp, slots));
            }
        }
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::FakeClock;
    use crate::cache::hooks::NoopListener;

    fn settings(capacity: usize, expiration: Option<Duration>, clock: Arc<FakeClock>) -> StoreSettings<u32, u32> {
        StoreSettings {
            capacity,
            expiration,
            eviction_fail_factor: 3,
            listener: Arc::new(NoopListener),
            expiry: None,
            clock,
        }
    }

    fn store(capacity: usize) -> OrderedStore<u32, u32> {
        OrderedStore::new(settings(capacity, None, Arc::new(FakeClock::new())))
    }

    fn fill(store: &mut OrderedStore<u32, u32>, keys: std::ops::Range<u32>) {
        for key in keys {
            store.insert(key, key * 10, Placement::Back, None).unwrap();
        }
    }

    #[test]
    fn test_insert_appends_and_prepends() {
        let mut store = store(0);

        store.insert(1, 10, Placement::Back, None).unwrap();
        store.insert(2, 20, Placement::Back, None).unwrap();
        store.insert(0, 0, Placement::Front, None).unwrap();

        assert_eq!(store.ordered_keys(), vec![0, 1, 2]);
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = store(0);
        fill(&mut store, 0..3);

        store.insert(0, 99, Placement::Back, None).unwrap();

        assert_eq!(store.ordered_keys(), vec![0, 1, 2]);
        assert_eq!(store.lookup(&0), Some(99));
        assert_eq!(store.item_count(), 3);
    }

    #[test]
    fn test_capacity_exceeded_without_expiration() {
        let mut store = store(8);
        fill(&mut store, 0..8);

        let result = store.insert(8, 80, Placement::Back, None);

        assert!(matches!(result, Err(CacheError::CapacityExceeded(8))));
        assert_eq!(store.item_count(), 8);
        assert_eq!(store.ledger_len(), 8);
        assert!(store.lookup(&8).is_none());
    }

    #[test]
    fn test_expired_head_reclaimed_on_insert() {
        let clock = Arc::new(FakeClock::new());
        let mut store = OrderedStore::new(settings(2, Some(Duration::from_millis(5)), clock.clone()));
        store.insert(1, 1, Placement::Back, None).unwrap();
        clock.advance(Duration::from_millis(3));
        store.insert(2, 2, Placement::Back, None).unwrap();
        clock.advance(Duration::from_millis(3));

        // Key 1 is expired, key 2 is not
        store.insert(3, 3, Placement::Back, None).unwrap();

        assert_eq!(store.ordered_keys(), vec![2, 3]);
        assert_eq!(store.stats().expired, 1);
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_unrepresentable_expiration_never_expires() {
        let clock = Arc::new(FakeClock::new());
        let mut store = OrderedStore::new(settings(0, Some(Duration::MAX), clock.clone()));

        store.insert(1, 10, Placement::Back, None).unwrap();
        store
            .insert_batch(vec![(2, 20), (3, 30)], Placement::Back)
            .unwrap();
        store.insert(4, 40, Placement::Back, Some(Duration::MAX)).unwrap();
        // Replacing an existing key takes the same path through the item
        store.insert(1, 11, Placement::Back, Some(Duration::MAX)).unwrap();
        clock.advance(Duration::from_secs(365 * 24 * 3600));

        assert_eq!(store.lookup(&1), Some(11));
        assert_eq!(store.live_keys(), vec![1, 2, 3, 4]);
        assert_eq!(store.remove_expired(8).unwrap(), 0);
        assert_eq!(store.stats().expired, 0);
    }

    #[test]
    fn test_reinsert_after_lazy_expiry_keeps_single_live_slot() {
        let clock = Arc::new(FakeClock::new());
        let mut store = OrderedStore::new(settings(0, Some(Duration::from_millis(1)), clock.clone()));
        store.insert(7, 1, Placement::Back, None).unwrap();
        clock.advance(Duration::from_millis(2));
        assert!(store.lookup(&7).is_none());

        store.insert(7, 2, Placement::Back, None).unwrap();

        // Old slot stays behind as a tombstone
        assert_eq!(store.ordered_keys(), vec![7, 7]);
        assert!(store.check_invariants().is_ok());
        assert_eq!(store.dequeue().unwrap(), (7, 2));
        assert_eq!(store.ledger_len(), 0);
    }

    #[test]
    fn test_batch_insert_partial_failure_keeps_inserted() {
        let mut store = store(3);
        let entries = (0..5).map(|key| (key, key)).collect();

        let result = store.insert_batch(entries, Placement::Back);

        assert!(matches!(result, Err(CacheError::CapacityExceeded(3))));
        assert_eq!(store.ordered_keys(), vec![0, 1, 2]);
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_front_batch_preserves_batch_order() {
        let mut store = store(0);
        fill(&mut store, 10..12);

        store
            .insert_batch(vec![(1, 1), (2, 2), (3, 3)], Placement::Front)
            .unwrap();

        assert_eq!(store.ordered_keys(), vec![1, 2, 3, 10, 11]);
    }

    #[test]
    fn test_dequeue_skips_tombstones() {
        let mut store = store(0);
        fill(&mut store, 0..5);
        store.discard(&0, RemovalCause::Removed);
        store.discard(&1, RemovalCause::Removed);

        assert_eq!(store.dequeue().unwrap(), (2, 20));
        assert_eq!(store.ordered_keys(), vec![3, 4]);
    }

    #[test]
    fn test_dequeue_empty() {
        let mut store = store(0);
        assert!(matches!(store.dequeue(), Err(CacheError::EmptyQueue)));
        assert!(matches!(store.peek_top(), Err(CacheError::EmptyQueue)));
        assert!(matches!(store.dequeue_batch(3), Err(CacheError::EmptyQueue)));
    }

    #[test]
    fn test_dequeue_batch_partial() {
        let mut store = store(0);
        fill(&mut store, 0..10);

        let pairs = store.dequeue_batch(4).unwrap();

        let keys: Vec<u32> = pairs.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
        assert_eq!(store.ordered_keys(), (4..10).collect::<Vec<_>>());
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_dequeue_batch_covering_ledger_resets() {
        let mut store = store(0);
        fill(&mut store, 0..5);
        store.discard(&2, RemovalCause::Removed);

        let pairs = store.dequeue_batch(5).unwrap();

        assert_eq!(pairs.len(), 4);
        assert_eq!(store.ledger_len(), 0);
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn test_peek_top_compacts_but_keeps_head() {
        let mut store = store(0);
        fill(&mut store, 0..4);
        store.discard(&0, RemovalCause::Removed);

        assert_eq!(store.peek_top().unwrap(), (1, 10));
        assert_eq!(store.ordered_keys(), vec![1, 2, 3]);
        assert_eq!(store.peek_top().unwrap(), (1, 10));
    }

    #[test]
    fn test_move_front_window() {
        let mut store = store(0);
        fill(&mut store, 0..5);

        store.move_front(&1, 2).unwrap();
        assert_eq!(store.ordered_keys(), vec![0, 1, 2, 3, 4]);

        store.move_front(&3, 2).unwrap();
        assert_eq!(store.ordered_keys(), vec![3, 0, 1, 2, 4]);

        assert!(matches!(store.move_front(&42, 2), Err(CacheError::KeyNotFound)));
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_rebuilds_small_ledger() {
        let mut store = store(0);
        fill(&mut store, 0..3);

        assert!(store.remove(&0));
        assert_eq!(store.ledger_len(), 3);

        assert!(store.remove(&2));
        assert_eq!(store.ordered_keys(), vec![1]);

        assert!(!store.remove(&2));
        assert!(store.remove(&1));
        assert_eq!(store.ledger_len(), 0);
    }

    #[test]
    fn test_remove_expired_stops_after_live_run() {
        let clock = Arc::new(FakeClock::new());
        let mut store = OrderedStore::new(settings(0, None, clock.clone()));
        store.insert(0, 0, Placement::Back, Some(Duration::from_millis(1))).unwrap();
        store.insert(1, 1, Placement::Back, None).unwrap();
        store.insert(2, 2, Placement::Back, None).unwrap();
        store.insert(3, 3, Placement::Back, Some(Duration::from_millis(1))).unwrap();
        clock.advance(Duration::from_millis(2));

        // Two consecutive live entries exceed a budget of one
        let reclaimed = store.remove_expired(1).unwrap();
        assert_eq!(reclaimed, 1);
        assert_eq!(store.ordered_keys(), vec![1, 2, 3]);

        let reclaimed = store.remove_expired(2).unwrap();
        assert_eq!(reclaimed, 1);
        assert_eq!(store.ordered_keys(), vec![1, 2]);
    }

    #[test]
    fn test_sweep_visits_live_in_order() {
        let mut store = store(0);
        fill(&mut store, 0..5);
        store.discard(&3, RemovalCause::Removed);

        let mut seen = Vec::new();
        let reclaimed = store.sweep(|key, value| seen.push((*key, *value))).unwrap();

        assert_eq!(reclaimed, 1);
        assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20), (4, 40)]);
        assert_eq!(store.ledger_len(), 4);
    }

    #[test]
    fn test_live_keys_and_purge() {
        let mut store = store(0);
        fill(&mut store, 0..3);
        store.discard(&1, RemovalCause::Removed);

        assert_eq!(store.live_keys(), vec![0, 2]);
        assert_eq!(store.ordered_keys(), vec![0, 1, 2]);

        store.purge();
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.ledger_len(), 0);
    }
}
