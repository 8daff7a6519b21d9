//! Expiry Cleanup Task
//!
//! Background task that periodically reclaims expired cache entries from the
//! head of the queue, so expiry is not left entirely to read-time checks.

use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::OrderedCache;

/// Spawns a background task that periodically calls
/// [`OrderedCache::remove_expired`].
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep
/// * `interval` - Pause between sweeps
/// * `max_failures` - Consecutive live entries a sweep passes before stopping
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = OrderedCache::builder(1000).expiration(Duration::from_secs(60)).build();
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1), 16);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(
    cache: OrderedCache<K, V>,
    interval: Duration,
    max_failures: usize,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            max_failures, "Starting expiry cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.remove_expired(max_failures) {
                Ok(0) => debug!("Expiry cleanup: nothing to reclaim"),
                Ok(reclaimed) => info!("Expiry cleanup: reclaimed {} entries", reclaimed),
                Err(err) => warn!(error = %err, "Expiry cleanup failed"),
            }
        }
    })
}
