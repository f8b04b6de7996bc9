//! SQLite-backed output queue shared by producers and consumers.
//!
//! Many tasks and many OS processes may open the same file. SQLite
//! serializes writers (WAL journal, bounded `busy_timeout`); inside one
//! process writes additionally pass through a single async mutex so a burst
//! of workers queues up in-process instead of spinning on the file lock.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use tokio::sync::Mutex;

use super::{
    queue_entities::{QueueItem, QueueStats},
    queue_repository::QueueRepository,
    queue_status::QueueStatus,
};
use crate::{Error, Result};

/// Lock wait before a contended write is reported as a storage error.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS output_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    created_at REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'processing')),
    processed_at REAL
);

CREATE INDEX IF NOT EXISTS idx_output_queue_status ON output_queue(status);
CREATE INDEX IF NOT EXISTS idx_output_queue_created ON output_queue(created_at);
";

const SELECT_ITEM: &str =
    "SELECT id, file_path, created_at, status, processed_at FROM output_queue";

/// Normalize an artifact path into a stable queue key.
///
/// Existing files are canonicalized; paths that do not exist (yet) are made
/// absolute against the current directory.
pub fn queue_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_or_else(
            |_| path.to_string_lossy().into_owned(),
            |resolved| resolved.to_string_lossy().into_owned(),
        )
}

#[allow(clippy::cast_precision_loss)]
fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn to_count(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|e| Error::storage(format!("Invalid row count {value}: {e}")))
}

pub struct OutputQueue {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    path: PathBuf,
}

impl OutputQueue {
    /// Open (creating if missing) the queue database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    pub async fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create queue directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(busy_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "Failed to open queue database {}: {e}",
                    path.display()
                ))
            })?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to initialize schema: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened output queue");

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn count_with_status(&self, status: QueueStatus) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM output_queue WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to count {status} rows: {e}")))?;
        to_count(count)
    }
}

#[async_trait::async_trait]
impl QueueRepository for OutputQueue {
    async fn add(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query(
            "INSERT INTO output_queue (file_path, created_at, status) VALUES (?, ?, 'pending') \
             ON CONFLICT(file_path) DO NOTHING",
        )
        .bind(key)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to add to queue: {e}")))?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            tracing::debug!(key, "Queued output");
        } else {
            tracing::debug!(key, "Output already queued");
        }
        Ok(inserted)
    }

    async fn count_pending(&self) -> Result<usize> {
        self.count_with_status(QueueStatus::Pending).await
    }

    async fn count_processing(&self) -> Result<usize> {
        self.count_with_status(QueueStatus::Processing).await
    }

    async fn stats(&self) -> Result<QueueStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM output_queue GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::storage(format!("Failed to read queue stats: {e}")))?;

        rows.into_iter()
            .try_fold(QueueStats::default(), |mut stats, (status, count)| {
                let count = to_count(count)?;
                match QueueStatus::from_str(&status)? {
                    QueueStatus::Pending => stats.pending = count,
                    QueueStatus::Processing => stats.processing = count,
                }
                stats.total += count;
                Ok(stats)
            })
    }

    async fn pending_keys(&self) -> Result<Vec<(String, f64)>> {
        sqlx::query_as(
            "SELECT file_path, created_at FROM output_queue WHERE status = 'pending' \
             ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to list pending keys: {e}")))
    }

    async fn next_pending(&self) -> Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT file_path FROM output_queue WHERE status = 'pending' \
             ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to read next pending key: {e}")))
    }

    async fn get(&self, key: &str) -> Result<Option<QueueItem>> {
        sqlx::query_as::<_, QueueItem>(&format!("{SELECT_ITEM} WHERE file_path = ?"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to read queue row: {e}")))
    }

    async fn list(&self, filter_status: Option<QueueStatus>) -> Result<Vec<QueueItem>> {
        let sql = match filter_status {
            Some(_) => format!("{SELECT_ITEM} WHERE status = ? ORDER BY created_at ASC, id ASC"),
            None => format!("{SELECT_ITEM} ORDER BY created_at ASC, id ASC"),
        };
        let query = sqlx::query_as::<_, QueueItem>(&sql);
        let query = match filter_status {
            Some(status) => query.bind(status.as_str()),
            None => query,
        };
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to list queue: {e}")))
    }

    async fn mark_processing(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query(
            "UPDATE output_queue SET status = 'processing', processed_at = ? \
             WHERE file_path = ? AND status = 'pending'",
        )
        .bind(now())
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to mark processing: {e}")))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM output_queue WHERE file_path = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Error::storage(format!("Failed to mark completed: {e}")))
    }

    /// Rows are deleted by id, so a key that another process completes and
    /// re-adds while the predicate runs keeps its new row.
    async fn sweep_missing(
        &self,
        exists: &(dyn for<'p> Fn(&'p Path) -> bool + Send + Sync),
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, file_path FROM output_queue")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to read queue keys: {e}")))?;

        let missing: Vec<(i64, String)> = rows
            .into_iter()
            .filter(|(_, key)| !exists(Path::new(key)))
            .collect();

        let mut removed = 0;
        for (id, key) in &missing {
            let result = sqlx::query("DELETE FROM output_queue WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::storage(format!("Failed to remove missing output: {e}")))?;
            if result.rows_affected() == 1 {
                tracing::info!(key = %key, "Removed queue row for missing output");
                removed += 1;
            }
        }
        Ok(removed)
    }
}
