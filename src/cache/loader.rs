//! Load Coordinator
//!
//! Single-flight loading for missing keys. The first caller to miss a key
//! becomes the leader of a flight and runs the loader outside the cache
//! lock; every other caller missing the same key attaches to that flight.
//! The loaded value is inserted and the flight retired under one lock
//! acquisition, then all waiters are woken with the same outcome.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::cache::hooks::Loader;
use crate::cache::ordered::OrderedCache;
use crate::cache::store::Placement;
use crate::error::{CacheError, Result};

// == Flight ==
/// Completion handle shared by every caller waiting on one load.
pub(crate) struct Flight<V> {
    outcome: Mutex<Option<Result<V>>>,
    done: Condvar,
}

impl<V: Clone> Flight<V> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Result<V>) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    /// Blocks until the flight completes. No timeout.
    fn wait(&self) -> Result<V> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }
}

enum Role<V> {
    Leader(Arc<Flight<V>>),
    Waiter(Arc<Flight<V>>),
}

// == Load Group ==
/// In-flight loads by key. Kept inside the cache state, so it is only ever
/// touched under the structural lock.
pub(crate) struct LoadGroup<K, V> {
    flights: HashMap<K, Arc<Flight<V>>>,
}

impl<K, V> LoadGroup<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            flights: HashMap::new(),
        }
    }

    fn join(&mut self, key: &K) -> Role<V> {
        if let Some(flight) = self.flights.get(key) {
            return Role::Waiter(Arc::clone(flight));
        }
        let flight = Arc::new(Flight::new());
        self.flights.insert(key.clone(), Arc::clone(&flight));
        Role::Leader(flight)
    }

    fn finish(&mut self, key: &K) {
        self.flights.remove(key);
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }
}

/// How a miss waits for its load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadMode {
    /// Block until the key's flight completes
    Wait,
    /// Start a flight if needed and report a miss right away
    Background,
}

impl<K, V> OrderedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Load ==
    /// Resolves a miss through the loader, coalescing concurrent callers.
    ///
    /// Without a configured loader this is a plain `KeyNotFound`.
    pub(crate) fn load(&self, key: &K, mode: LoadMode) -> Result<V> {
        let Some(loader) = self.shared.loader.clone() else {
            return Err(CacheError::KeyNotFound);
        };

        let role = {
            let mut state = self.shared.state.write();
            // Another flight may have stored the key since the caller missed
            if let Some(stored) = state.store.peek(key) {
                drop(state);
                return self.decode(key, stored);
            }
            state.loads.join(key)
        };

        match (role, mode) {
            (Role::Leader(flight), LoadMode::Wait) => {
                self.run_flight(key, &flight, loader.as_ref());
                flight.wait()
            }
            (Role::Waiter(flight), LoadMode::Wait) => flight.wait(),
            (Role::Leader(flight), LoadMode::Background) => {
                self.spawn_flight(key, flight, loader);
                Err(CacheError::KeyNotFound)
            }
            (Role::Waiter(_), LoadMode::Background) => Err(CacheError::KeyNotFound),
        }
    }

    fn spawn_flight(&self, key: &K, flight: Arc<Flight<V>>, loader: Arc<dyn Loader<K, V>>) {
        let cache = self.clone();
        let task_key = key.clone();
        let task_flight = Arc::clone(&flight);
        let spawned = thread::Builder::new()
            .name("ordered-cache-load".to_string())
            .spawn(move || cache.run_flight(&task_key, &task_flight, loader.as_ref()));

        if let Err(err) = spawned {
            warn!(error = %err, "could not start background load");
            self.shared.state.write().loads.finish(key);
            flight.complete(Err(CacheError::loader(err.into())));
        }
    }

    /// Runs the loader for a flight this caller leads and settles it.
    ///
    /// A panic anywhere between the loader call and the insert fails the
    /// flight for every waiter and retires it before the panic continues on
    /// this thread.
    fn run_flight(&self, key: &K, flight: &Flight<V>, loader: &dyn Loader<K, V>) {
        debug!("loading missing key");
        let (outcome, panic_payload) =
            match panic::catch_unwind(AssertUnwindSafe(|| self.load_and_store(key, loader))) {
                Ok(outcome) => (outcome, None),
                Err(payload) => {
                    let mut state = self.shared.state.write();
                    state.store.stats_mut().record_load(false);
                    state.loads.finish(key);
                    (
                        Err(CacheError::loader(anyhow!("load panicked"))),
                        Some(payload),
                    )
                }
            };

        match &outcome {
            Ok(_) => debug!("load finished"),
            Err(err) => warn!(error = %err, "load failed, key stays absent"),
        }
        flight.complete(outcome);

        if let Some(payload) = panic_payload {
            panic::resume_unwind(payload);
        }
    }

    /// Loads and encodes outside the lock, then inserts the value and
    /// retires the flight under one acquisition.
    fn load_and_store(&self, key: &K, loader: &dyn Loader<K, V>) -> Result<V> {
        let prepared = loader
            .load(key)
            .map_err(CacheError::loader)
            .and_then(|loaded| {
                let stored = self.encode(key, loaded.value.clone())?;
                Ok((stored, loaded))
            });

        let mut state = self.shared.state.write();
        let outcome = prepared.and_then(|(stored, loaded)| {
            state
                .store
                .insert(key.clone(), stored, Placement::Back, loaded.expires_in)?;
            Ok(loaded.value)
        });
        state.store.stats_mut().record_load(outcome.is_ok());
        state.loads.finish(key);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_group_join_assigns_single_leader() {
        let mut group: LoadGroup<u32, u32> = LoadGroup::new();

        assert!(matches!(group.join(&1), Role::Leader(_)));
        assert!(matches!(group.join(&1), Role::Waiter(_)));
        assert!(matches!(group.join(&2), Role::Leader(_)));
        assert_eq!(group.len(), 2);

        group.finish(&1);
        assert_eq!(group.len(), 1);
        assert!(matches!(group.join(&1), Role::Leader(_)));
    }

    #[test]
    fn test_flight_wakes_all_waiters() {
        let flight = Arc::new(Flight::<u32>::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let flight = Arc::clone(&flight);
                thread::spawn(move || flight.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        flight.complete(Ok(7));

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().unwrap(), 7);
        }
    }

    #[test]
    fn test_flight_shares_error() {
        let flight = Flight::<u32>::new();
        flight.complete(Err(CacheError::loader(anyhow!("boom"))));

        assert!(matches!(flight.wait(), Err(CacheError::Loader(_))));
        assert!(matches!(flight.wait(), Err(CacheError::Loader(_))));
    }

    #[test]
    fn test_panicking_loader_clears_flight() {
        let cache: OrderedCache<u32, u32> = OrderedCache::builder(0)
            .loader(|_key: &u32| -> anyhow::Result<u32> { panic!("loader bug") })
            .build();

        let leader = {
            let cache = cache.clone();
            thread::spawn(move || cache.get(&1))
        };

        // The panic surfaces in the calling thread, not as a stuck flight
        assert!(leader.join().is_err());
        assert_eq!(cache.pending_loads(), 0);
        assert_eq!(cache.stats().load_failures, 1);
        assert!(cache.keys().is_empty());
    }
}
