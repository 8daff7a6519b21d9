//! Cache Builder
//!
//! Collects capacity, expiration policy and hooks, then builds an
//! [`OrderedCache`].

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::hooks::{
    CacheListener, ExpiryPredicate, Loaded, Loader, NoopListener, ValueCodec,
};
use crate::cache::ordered::OrderedCache;
use crate::cache::store::{OrderedStore, StoreSettings};
use crate::cache::{DEFAULT_EVICTION_FAIL_FACTOR, DEFAULT_MOVE_FRONT_WINDOW};
use crate::config::Config;

/// Builder for [`OrderedCache`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ordered_cache::CacheBuilder;
///
/// let cache = CacheBuilder::new(128)
///     .expiration(Duration::from_secs(30))
///     .loader(|key: &u32| Ok(key * 2))
///     .build();
///
/// assert_eq!(cache.get(&21).unwrap(), 42);
/// ```
pub struct CacheBuilder<K, V> {
    capacity: usize,
    expiration: Option<Duration>,
    eviction_fail_factor: usize,
    move_front_window: usize,
    loader: Option<Arc<dyn Loader<K, V>>>,
    codec: Option<Arc<dyn ValueCodec<K, V>>>,
    listener: Arc<dyn CacheListener<K, V>>,
    expiry: Option<Arc<dyn ExpiryPredicate<K>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts a builder. A capacity of 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            expiration: None,
            eviction_fail_factor: DEFAULT_EVICTION_FAIL_FACTOR,
            move_front_window: DEFAULT_MOVE_FRONT_WINDOW,
            loader: None,
            codec: None,
            listener: Arc::new(NoopListener),
            expiry: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Starts a builder from environment-derived configuration.
    pub fn from_config(config: &Config) -> Self {
        let builder = Self::new(config.max_entries)
            .eviction_fail_factor(config.eviction_fail_factor)
            .move_front_window(config.move_front_window);
        match config.expiration() {
            Some(ttl) => builder.expiration(ttl),
            None => builder,
        }
    }

    /// Expiration applied to every inserted or replaced value.
    pub fn expiration(mut self, ttl: Duration) -> Self {
        self.expiration = Some(ttl);
        self
    }

    pub fn eviction_fail_factor(mut self, factor: usize) -> Self {
        self.eviction_fail_factor = factor;
        self
    }

    pub fn move_front_window(mut self, window: usize) -> Self {
        self.move_front_window = window;
        self
    }

    /// Loader for missing keys.
    pub fn loader<F>(mut self, load: F) -> Self
    where
        F: Fn(&K) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(move |key: &K| load(key).map(Loaded::new)));
        self
    }

    /// Loader that may override the expiration of each value it produces.
    pub fn loader_with_expiration<F>(mut self, load: F) -> Self
    where
        F: Fn(&K) -> anyhow::Result<Loaded<V>> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(load));
        self
    }

    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: CacheListener<K, V> + 'static,
    {
        self.listener = Arc::new(listener);
        self
    }

    /// Dynamic expiration predicate, checked on every expiry test.
    pub fn expire_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&K) -> bool + Send + Sync + 'static,
    {
        self.expiry = Some(Arc::new(predicate));
        self
    }

    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: ValueCodec<K, V> + 'static,
    {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> OrderedCache<K, V> {
        let store = OrderedStore::new(StoreSettings {
            capacity: self.capacity,
            expiration: self.expiration,
            eviction_fail_factor: self.eviction_fail_factor,
            listener: self.listener,
            expiry: self.expiry,
            clock: self.clock,
        });
        OrderedCache::from_parts(store, self.loader, self.codec, self.move_front_window)
    }
}
