//! Cache Item Module
//!
//! Defines the value wrapper stored for each key, with optional expiration.

use std::time::{Duration, Instant};

/// Absolute deadline `ttl` after `now`, or None when that instant is not
/// representable. An unrepresentable deadline is treated as no deadline.
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

// == Item ==
/// A stored value with its expiration metadata.
#[derive(Debug, Clone)]
pub(crate) struct Item<V> {
    /// The stored (possibly serialized) value
    pub value: V,
    /// Absolute expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Insertion stamp matching the ledger slot written for this item
    pub(crate) stamp: u64,
}

impl<V> Item<V> {
    // == Constructor ==
    pub(crate) fn new(value: V, expires_at: Option<Instant>, stamp: u64) -> Self {
        Self {
            value,
            expires_at,
            stamp,
        }
    }

    // == Is Expired ==
    /// Checks if the item's own deadline has passed.
    ///
    /// Boundary condition: an item is expired only once `now` is strictly
    /// after `expires_at`. Items without a deadline never expire here; the
    /// store layers the dynamic expiration predicate on top of this check.
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now > deadline)
    }

    /// Resets the deadline to `now + ttl`.
    pub(crate) fn expire_after(&mut self, now: Instant, ttl: Duration) {
        self.expires_at = deadline(now, ttl);
    }
}
