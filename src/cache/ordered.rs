//! Ordered Cache Module
//!
//! Thread-safe public operation set. Every structural operation takes the
//! single exclusive lock for its whole scan-and-compact duration, so callers
//! never observe a half-applied reorder. Raw key listings take the shared side.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::cache::builder::CacheBuilder;
use crate::cache::hooks::{Loader, ValueCodec};
use crate::cache::loader::{LoadGroup, LoadMode};
use crate::cache::stats::CacheStats;
use crate::cache::store::{OrderedStore, Placement};
use crate::error::{CacheError, Result};

/// Everything guarded by the structural lock.
pub(crate) struct State<K, V> {
    pub(crate) store: OrderedStore<K, V>,
    pub(crate) loads: LoadGroup<K, V>,
}

pub(crate) struct Shared<K, V> {
    pub(crate) state: RwLock<State<K, V>>,
    pub(crate) loader: Option<Arc<dyn Loader<K, V>>>,
    codec: Option<Arc<dyn ValueCodec<K, V>>>,
    move_front_window: usize,
}

// == Ordered Cache ==
/// Bounded key-value cache with queue ordering, lazy expiration and
/// single-flight loading.
///
/// Cloning is cheap and yields a handle to the same cache.
pub struct OrderedCache<K, V> {
    pub(crate) shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for OrderedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> OrderedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with the given capacity (0 = unbounded) and no hooks.
    pub fn new(capacity: usize) -> Self {
        CacheBuilder::new(capacity).build()
    }

    pub fn builder(capacity: usize) -> CacheBuilder<K, V> {
        CacheBuilder::new(capacity)
    }

    pub(crate) fn from_parts(
        store: OrderedStore<K, V>,
        loader: Option<Arc<dyn Loader<K, V>>>,
        codec: Option<Arc<dyn ValueCodec<K, V>>>,
        move_front_window: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    store,
                    loads: LoadGroup::new(),
                }),
                loader,
                codec,
                move_front_window,
            }),
        }
    }

    pub(crate) fn encode(&self, key: &K, value: V) -> Result<V> {
        match &self.shared.codec {
            Some(codec) => codec
                .encode(key, value)
                .map_err(CacheError::serialization),
            None => Ok(value),
        }
    }

    pub(crate) fn decode(&self, key: &K, stored: V) -> Result<V> {
        match &self.shared.codec {
            Some(codec) => codec
                .decode(key, &stored)
                .map_err(CacheError::serialization),
            None => Ok(stored),
        }
    }

    fn lookup(&self, key: &K) -> Result<V> {
        let stored = self
            .shared
            .state
            .write()
            .store
            .lookup(key)
            .ok_or(CacheError::KeyNotFound)?;
        self.decode(key, stored)
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// On a miss with a loader configured, blocks until the key's load
    /// completes (started here or by a concurrent caller).
    pub fn get(&self, key: &K) -> Result<V> {
        match self.lookup(key) {
            Err(CacheError::KeyNotFound) => self.load(key, LoadMode::Wait),
            other => other,
        }
    }

    // == Get If Present ==
    /// Returns the live value for `key` without waiting for a load.
    ///
    /// A miss starts a background load when a loader is configured and
    /// none is running for the key; the caller still gets `KeyNotFound`.
    pub fn get_if_present(&self, key: &K) -> Result<V> {
        match self.lookup(key) {
            Err(CacheError::KeyNotFound) => self.load(key, LoadMode::Background),
            other => other,
        }
    }

    // == Set / Enqueue ==
    /// Alias of [`enqueue`](Self::enqueue).
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.enqueue(key, value)
    }

    /// Inserts at the tail, or replaces the value of an existing key in place.
    pub fn enqueue(&self, key: K, value: V) -> Result<()> {
        let stored = self.encode(&key, value)?;
        self.shared
            .state
            .write()
            .store
            .insert(key, stored, Placement::Back, None)
    }

    /// Inserts at the head, or replaces the value of an existing key in place.
    pub fn add_front(&self, key: K, value: V) -> Result<()> {
        let stored = self.encode(&key, value)?;
        self.shared
            .state
            .write()
            .store
            .insert(key, stored, Placement::Front, None)
    }

    // == Batch Inserts ==
    /// Appends a batch at the tail in batch order.
    pub fn enqueue_batch(&self, keys: Vec<K>, values: Vec<V>) -> Result<()> {
        self.insert_batch(keys, values, Placement::Back)
    }

    /// Prepends a batch at the head as one block, keeping batch order.
    pub fn add_front_batch(&self, keys: Vec<K>, values: Vec<V>) -> Result<()> {
        self.insert_batch(keys, values, Placement::Front)
    }

    fn insert_batch(&self, keys: Vec<K>, values: Vec<V>, placement: Placement) -> Result<()> {
        if keys.len() != values.len() {
            return Err(CacheError::InvalidArgument(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        let entries = keys
            .into_iter()
            .zip(values)
            .map(|(key, value)| {
                let stored = self.encode(&key, value)?;
                Ok((key, stored))
            })
            .collect::<Result<Vec<_>>>()?;
        self.shared
            .state
            .write()
            .store
            .insert_batch(entries, placement)
    }

    // == Dequeue ==
    /// Removes and returns the head entry.
    pub fn dequeue(&self) -> Result<(K, V)> {
        let (key, stored) = self.shared.state.write().store.dequeue()?;
        let value = self.decode(&key, stored)?;
        Ok((key, value))
    }

    /// Removes and returns up to `count` entries from the head, oldest first.
    pub fn dequeue_batch(&self, count: usize) -> Result<Vec<(K, V)>> {
        let pairs = self.shared.state.write().store.dequeue_batch(count)?;
        self.decode_pairs(pairs)
    }

    /// Returns the head entry without removing it.
    pub fn peek_top(&self) -> Result<(K, V)> {
        let (key, stored) = self.shared.state.write().store.peek_top()?;
        let value = self.decode(&key, stored)?;
        Ok((key, value))
    }

    // == Move Front ==
    /// Moves `key` to the head of the queue.
    ///
    /// Keys already within the configured window at the head stay put.
    pub fn move_front(&self, key: &K) -> Result<()> {
        self.shared
            .state
            .write()
            .store
            .move_front(key, self.shared.move_front_window)
    }

    // == Remove ==
    /// Removes `key`, returning whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.shared.state.write().store.remove(key)
    }

    /// Reclaims expired and stale entries from the head, stopping after more
    /// than `max_failures` consecutive live entries.
    pub fn remove_expired(&self, max_failures: usize) -> Result<usize> {
        self.shared.state.write().store.remove_expired(max_failures)
    }

    // == Get All ==
    /// Full compacting scan returning every live entry in queue order.
    pub fn get_all(&self) -> Result<Vec<(K, V)>> {
        let mut live = Vec::new();
        self.shared
            .state
            .write()
            .store
            .sweep(|key, value| live.push((key.clone(), value.clone())))?;
        self.decode_pairs(live)
    }

    /// Same scan as [`get_all`](Self::get_all), split into keys and values.
    pub fn get_keys_and_values(&self) -> Result<(Vec<K>, Vec<V>)> {
        Ok(self.get_all()?.into_iter().unzip())
    }

    /// Compacts away every stale and expired entry.
    pub fn refresh(&self) -> Result<()> {
        self.shared.state.write().store.sweep(|_, _| {})?;
        Ok(())
    }

    // == Length ==
    /// Returns the ledger length.
    ///
    /// When fewer than half the ledger entries are live, the ledger is
    /// compacted first so tombstones do not inflate the answer for long.
    pub fn len(&self) -> usize {
        let mut state = self.shared.state.write();
        if state.store.item_count() < state.store.ledger_len() / 2 {
            if let Err(err) = state.store.sweep(|_, _| {}) {
                warn!(error = %err, "ledger compaction failed");
            }
        }
        state.store.ledger_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Purge ==
    /// Reports every item to the purge callback and empties the cache.
    pub fn purge(&self) {
        let mut state = self.shared.state.write();
        let purged = state.store.item_count();
        state.store.purge();
        info!(purged, "cache purged");
    }

    // == Keys ==
    /// Live keys in queue order.
    pub fn keys(&self) -> Vec<K> {
        self.shared.state.read().store.live_keys()
    }

    /// Raw ledger snapshot, stale entries included.
    pub fn ordered_keys(&self) -> Vec<K> {
        self.shared.state.read().store.ordered_keys()
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        self.shared.state.read().store.stats()
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.read().store.capacity()
    }

    /// Number of loads currently in flight.
    pub fn pending_loads(&self) -> usize {
        self.shared.state.read().loads.len()
    }

    fn decode_pairs(&self, pairs: Vec<(K, V)>) -> Result<Vec<(K, V)>> {
        pairs
            .into_iter()
            .map(|(key, stored)| {
                let value = self.decode(&key, stored)?;
                Ok((key, value))
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        self.shared.state.read().store.check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_enqueue_dequeue_fifo() {
        let cache = OrderedCache::new(0);
        for key in 0..10u32 {
            cache.enqueue(key, key * 2).unwrap();
        }

        for key in 0..10u32 {
            assert_eq!(cache.dequeue().unwrap(), (key, key * 2));
        }
        assert!(matches!(cache.dequeue(), Err(CacheError::EmptyQueue)));
    }

    #[test]
    fn test_get_without_loader_misses() {
        let cache: OrderedCache<u32, u32> = OrderedCache::new(4);

        assert!(matches!(cache.get(&1), Err(CacheError::KeyNotFound)));
        assert!(matches!(cache.get_if_present(&1), Err(CacheError::KeyNotFound)));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_batch_length_mismatch() {
        let cache: OrderedCache<u32, u32> = OrderedCache::new(0);

        let result = cache.enqueue_batch(vec![1, 2], vec![1]);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert!(cache.ordered_keys().is_empty());
    }

    #[test]
    fn test_len_compacts_bloated_ledger() {
        let cache = OrderedCache::new(0);
        for key in 0..10u32 {
            cache.enqueue(key, key).unwrap();
        }
        for key in 0..3u32 {
            cache.remove(&key);
        }
        // 7 of 10 entries live: no compaction yet
        assert_eq!(cache.len(), 10);

        for key in 3..7u32 {
            cache.remove(&key);
        }
        // 3 of 10 live: compacted on read
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.ordered_keys(), vec![7, 8, 9]);
    }

    #[test]
    fn test_single_flight_blocking_loads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: OrderedCache<u32, String> = OrderedCache::builder(16)
            .loader(move |key: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(100));
                Ok(format!("value-{key}"))
            })
            .build();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&5)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "value-5");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.pending_loads(), 0);
        assert!(cache.check_invariants().is_ok());
    }
}
