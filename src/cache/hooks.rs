//! Hooks Module
//!
//! Strategy objects a cache can be configured with: the loader, the value
//! codec, the listener for added/evicted/purged items and the dynamic
//! expiration predicate. Every one of them is optional.

use std::time::Duration;

// == Removal Cause ==
/// Why an item left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Expired, either by deadline or by the expiration predicate
    Expired,
    /// Removed explicitly by key
    Removed,
    /// Taken from the head of the queue
    Dequeued,
}

// == Listener ==
/// Side-effect callbacks invoked under the cache lock.
///
/// Implementations must not call back into the cache.
pub trait CacheListener<K, V>: Send + Sync {
    /// A value was inserted or replaced.
    fn on_added(&self, _key: &K, _value: &V) {}

    /// An item left the cache for `cause`.
    fn on_evicted(&self, _key: &K, _value: &V, _cause: RemovalCause) {}

    /// An item was dropped by `purge`.
    fn on_purged(&self, _key: &K, _value: &V) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl<K, V> CacheListener<K, V> for NoopListener {}

// == Expiry Predicate ==
/// Dynamic expiration check, consulted on every expiry test in addition to
/// the item's own deadline.
pub trait ExpiryPredicate<K>: Send + Sync {
    fn is_expired(&self, key: &K) -> bool;
}

impl<K, F> ExpiryPredicate<K> for F
where
    F: Fn(&K) -> bool + Send + Sync,
{
    fn is_expired(&self, key: &K) -> bool {
        self(key)
    }
}

// == Value Codec ==
/// Transforms values on their way into and out of the store.
pub trait ValueCodec<K, V>: Send + Sync {
    /// Applied to every inserted value.
    fn encode(&self, key: &K, value: V) -> anyhow::Result<V>;

    /// Applied to every value read back.
    fn decode(&self, key: &K, stored: &V) -> anyhow::Result<V>;
}

// == Loader ==
/// A loaded value plus an optional per-item expiration override.
#[derive(Debug, Clone)]
pub struct Loaded<V> {
    pub value: V,
    pub expires_in: Option<Duration>,
}

impl<V> Loaded<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            expires_in: None,
        }
    }

    pub fn expiring_in(value: V, expires_in: Duration) -> Self {
        Self {
            value,
            expires_in: Some(expires_in),
        }
    }
}

/// Produces values for missing keys. Called outside the cache lock.
pub trait Loader<K, V>: Send + Sync {
    fn load(&self, key: &K) -> anyhow::Result<Loaded<V>>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K) -> anyhow::Result<Loaded<V>> + Send + Sync,
{
    fn load(&self, key: &K) -> anyhow::Result<Loaded<V>> {
        self(key)
    }
}
