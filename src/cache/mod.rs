//! Cache Module
//!
//! Provides the ordered cache engine: an item index paired with a queue
//! ledger, bounded eviction, lazy expiration and single-flight loading.

mod builder;
mod clock;
mod entry;
mod evict;
mod hooks;
mod ledger;
mod loader;
mod ordered;
mod stats;
mod store;


// Re-export public types
pub use builder::CacheBuilder;
pub use clock::{Clock, FakeClock, SystemClock};
pub use hooks::{
    CacheListener, ExpiryPredicate, Loaded, Loader, NoopListener, RemovalCause, ValueCodec,
};
pub use ledger::remove_positions;
pub use ordered::OrderedCache;
pub use stats::CacheStats;

// == Public Constants ==
/// Non-reclaimable entries an eviction scan tolerates per requested slot
pub const DEFAULT_EVICTION_FAIL_FACTOR: usize = 3;

/// Keys within this many head positions are left in place by `move_front`
pub const DEFAULT_MOVE_FRONT_WINDOW: usize = 2;
