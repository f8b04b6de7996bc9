//! Queue Repository Trait - abstraction boundary for queue persistence.
//!
//! The admission controller and the worker pool only talk to the store
//! through this trait. `OutputQueue` is the SQLite implementation.

use std::path::Path;

use super::{queue_entities::QueueItem, queue_entities::QueueStats, queue_status::QueueStatus};
use crate::Result;

/// Persistence boundary for the output queue.
///
/// Every method must be safe to call concurrently from many tasks and from
/// other processes sharing the same backing store.
#[async_trait::async_trait]
pub trait QueueRepository: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // PRODUCER OPERATIONS
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Insert a `pending` row. Returns `false` if the key is already live.
    async fn add(&self, key: &str) -> Result<bool>;

    async fn count_pending(&self) -> Result<usize>;

    async fn count_processing(&self) -> Result<usize>;

    /// Rows not yet removed (pending + processing).
    async fn count_unprocessed(&self) -> Result<usize> {
        let stats = self.stats().await?;
        Ok(stats.unprocessed())
    }

    async fn stats(&self) -> Result<QueueStats>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // INSPECTION
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Pending `(key, created_at)` pairs, oldest first.
    async fn pending_keys(&self) -> Result<Vec<(String, f64)>>;

    /// Oldest pending key, without claiming it.
    async fn next_pending(&self) -> Result<Option<String>>;

    async fn get(&self, key: &str) -> Result<Option<QueueItem>>;

    /// Live rows, optionally filtered by status, oldest first.
    async fn list(&self, filter_status: Option<QueueStatus>) -> Result<Vec<QueueItem>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // CONSUMER OPERATIONS
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Compare-and-swap `pending -> processing`. Exactly one concurrent caller wins.
    async fn mark_processing(&self, key: &str) -> Result<bool>;

    /// Delete the row. Deleting an absent key is not an error.
    async fn mark_completed(&self, key: &str) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // MAINTENANCE
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Delete rows whose key fails `exists`. Returns the number removed.
    async fn sweep_missing(&self, exists: &(dyn for<'p> Fn(&'p Path) -> bool + Send + Sync))
        -> Result<usize>;
}
