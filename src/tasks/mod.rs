//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Expiry Cleanup: Reclaims expired entries at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
