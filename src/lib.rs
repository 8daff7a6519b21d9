//! Ordered Cache - a bounded in-process key-value cache with queue ordering
//!
//! Provides FIFO enqueue/dequeue semantics on top of a plain cache, lazy
//! time-based expiration, bounded-cost eviction and single-flight loading of
//! missing keys.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheBuilder, OrderedCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
