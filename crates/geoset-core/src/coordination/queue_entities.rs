//! Row types for the output queue.
//!
//! Domain status lives in `queue_status.rs`, operations in `queue.rs`.

use serde::Serialize;

use super::queue_status::QueueStatus;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// QUEUE ITEM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A row in the `output_queue` table.
///
/// Timestamps are fractional Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct QueueItem {
    pub id: i64,
    #[sqlx(rename = "file_path")]
    pub key: String,
    pub created_at: f64,
    #[sqlx(try_from = "String")]
    pub status: QueueStatus,
    pub processed_at: Option<f64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// QUEUE STATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub total: usize,
}

impl QueueStats {
    /// Rows not yet removed by a consumer.
    #[must_use]
    pub const fn unprocessed(&self) -> usize {
        self.pending + self.processing
    }
}
