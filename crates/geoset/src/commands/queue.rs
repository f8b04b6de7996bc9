//! Queue command implementation
//!
//! Consumer-side and recovery operations on the output queue, for operators
//! and for scripts that consume the produced files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geoset_core::{queue_key, OutputQueue, QueueItem, QueueRepository, QueueStatus};
use serde::Serialize;

use crate::json::Envelope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAction {
    Status,
    List { status: Option<QueueStatus> },
    Next,
    Claim { key: String },
    Complete { key: String },
    Sweep,
}

#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub db_path: PathBuf,
    pub json: bool,
    pub action: QueueAction,
}

#[derive(Serialize)]
struct KeyResult<'a> {
    key: Option<&'a str>,
}

#[derive(Serialize)]
struct ClaimResult<'a> {
    key: &'a str,
    claimed: bool,
}

#[derive(Serialize)]
struct SweepResult {
    removed: usize,
}

#[derive(Serialize)]
struct ListResult<'a> {
    items: &'a [QueueItem],
}

/// Run the queue command
///
/// # Errors
///
/// Returns an error if the queue database cannot be opened or queried
pub async fn run(options: &QueueOptions) -> Result<()> {
    let queue = OutputQueue::open(&options.db_path)
        .await
        .with_context(|| format!("Failed to open queue {}", options.db_path.display()))?;

    let result = execute(&queue, options).await;
    queue.close().await;
    result
}

async fn execute(queue: &dyn QueueRepository, options: &QueueOptions) -> Result<()> {
    match &options.action {
        QueueAction::Status => handle_status(queue, options.json).await,
        QueueAction::List { status } => handle_list(queue, *status, options.json).await,
        QueueAction::Next => handle_next(queue, options.json).await,
        QueueAction::Claim { key } => handle_claim(queue, key, options.json).await,
        QueueAction::Complete { key } => handle_complete(queue, key, options.json).await,
        QueueAction::Sweep => handle_sweep(queue, options.json).await,
    }
}

async fn handle_status(queue: &dyn QueueRepository, json: bool) -> Result<()> {
    let stats = queue.stats().await?;
    if json {
        return Envelope::new("queue-status", stats).print();
    }
    println!("Queue Status:");
    println!("  Pending:    {}", stats.pending);
    println!("  Processing: {}", stats.processing);
    println!("  Total:      {}", stats.total);
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn format_timestamp(seconds: f64) -> String {
    chrono::DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
        .map_or_else(|| format!("{seconds:.3}"), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

async fn handle_list(
    queue: &dyn QueueRepository,
    status: Option<QueueStatus>,
    json: bool,
) -> Result<()> {
    let items = queue.list(status).await?;
    if json {
        return Envelope::new("queue-list", ListResult { items: &items }).print();
    }
    if items.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }
    println!("{:>6}  {:<10}  {:<19}  KEY", "ID", "STATUS", "CREATED");
    for item in &items {
        println!(
            "{:>6}  {:<10}  {:<19}  {}",
            item.id,
            item.status,
            format_timestamp(item.created_at),
            item.key
        );
    }
    Ok(())
}

async fn handle_next(queue: &dyn QueueRepository, json: bool) -> Result<()> {
    let key = queue.next_pending().await?;
    if json {
        return Envelope::new("queue-next", KeyResult { key: key.as_deref() }).print();
    }
    match key {
        Some(key) => println!("{key}"),
        None => println!("Queue is empty"),
    }
    Ok(())
}

async fn handle_claim(queue: &dyn QueueRepository, key: &str, json: bool) -> Result<()> {
    let key = queue_key(Path::new(key));
    let claimed = queue.mark_processing(&key).await?;
    if json {
        return Envelope::new("queue-claim", ClaimResult { key: &key, claimed })
            .with_success(claimed)
            .print();
    }
    if claimed {
        println!("Claimed {key}");
    } else {
        println!("{key} is not pending (already claimed or not queued)");
    }
    Ok(())
}

async fn handle_complete(queue: &dyn QueueRepository, key: &str, json: bool) -> Result<()> {
    let key = queue_key(Path::new(key));
    queue.mark_completed(&key).await?;
    if json {
        return Envelope::new("queue-complete", KeyResult { key: Some(&key) }).print();
    }
    println!("Completed {key}");
    Ok(())
}

async fn handle_sweep(queue: &dyn QueueRepository, json: bool) -> Result<()> {
    let removed = queue.sweep_missing(&|path: &Path| path.exists()).await?;
    if json {
        return Envelope::new("queue-sweep", SweepResult { removed }).print();
    }
    println!("Removed {removed} row(s) whose file no longer exists");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn options(dir: &Path, action: QueueAction) -> Result<(QueueOptions, OutputQueue)> {
        let db_path = dir.join("queue.db");
        let queue = OutputQueue::open(&db_path).await?;
        Ok((
            QueueOptions {
                db_path,
                json: false,
                action,
            },
            queue,
        ))
    }

    #[tokio::test]
    async fn test_claim_then_complete_by_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("1_a.tif");
        std::fs::write(&file, b"tif")?;
        let key = queue_key(&file);

        let raw = file.to_string_lossy().into_owned();
        let (claim, queue) = options(dir.path(), QueueAction::Claim { key: raw.clone() }).await?;
        queue.add(&key).await?;

        execute(&queue, &claim).await?;
        assert_eq!(queue.count_processing().await?, 1);

        let complete = QueueOptions {
            action: QueueAction::Complete { key: raw },
            ..claim
        };
        execute(&queue, &complete).await?;
        assert_eq!(queue.stats().await?.total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_drops_missing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (sweep, queue) = options(dir.path(), QueueAction::Sweep).await?;
        queue.add(&dir.path().join("gone.tif").to_string_lossy()).await?;

        execute(&queue, &sweep).await?;
        assert_eq!(queue.stats().await?.total, 0);
        Ok(())
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "1970-01-01 00:00:00");
    }
}
