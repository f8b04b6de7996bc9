//! Shared fakes for the pipeline integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use geoset_core::{
    coordination::QueueRepository,
    pipeline::{Artifact, ArtifactMetadata, ArtifactWriter, BBox, BatchWriter},
    ArtifactProducer, Error, OutputQueue, QueueItem, QueueStats, QueueStatus, Result, WorkItem,
};
use image::RgbImage;

pub const FAST_POLL: Duration = Duration::from_millis(20);

pub async fn open_queue(dir: &Path) -> Result<Arc<OutputQueue>> {
    Ok(Arc::new(OutputQueue::open(&dir.join("queue.db")).await?))
}

pub fn points(n: usize) -> Vec<WorkItem> {
    (1..=n)
        .map(|i| WorkItem::at_point(i.to_string(), "site", i as f64 * 0.01, 0.0))
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PRODUCER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tiny artifacts; fails or panics for chosen ids.
#[derive(Default)]
pub struct FakeProducer {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeProducer {
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn panicking_on(mut self, ids: &[&str]) -> Self {
        self.panicking = ids.iter().map(ToString::to_string).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ArtifactProducer for FakeProducer {
    async fn produce(&self, item: &WorkItem) -> Result<Option<Artifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(point) = item.geometry.as_point() else {
            return Ok(None);
        };
        if self.failing.contains(&item.id) {
            return Err(Error::produce(format!("tile fetch failed for {}", item.id)));
        }
        if self.panicking.contains(&item.id) {
            panic!("renderer crashed on {}", item.id);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        let metadata = ArtifactMetadata::new(BBox::around(point, 0.001), "EPSG:4326")
            .with("item_id", item.id.clone());
        Ok(Some(Artifact::new(RgbImage::new(4, 4), metadata)))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WRITERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Writes a marker file per item.
pub struct TouchWriter {
    pub dir: PathBuf,
    writes: AtomicUsize,
}

impl TouchWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ArtifactWriter for TouchWriter {
    async fn write(&self, _artifact: &Artifact, id: &str, label: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("{id}_{label}.tif"));
        tokio::fs::write(&path, b"tif").await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(path)
    }
}

/// Batch writer that always fails.
pub struct BrokenBatchWriter;

#[async_trait::async_trait]
impl BatchWriter for BrokenBatchWriter {
    async fn write_all(&self, _records: &[(WorkItem, Artifact)]) -> Result<PathBuf> {
        Err(Error::write("disk full"))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RECORDING QUEUE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Delegates to a real queue and samples `count_pending` after every add.
pub struct RecordingQueue {
    inner: Arc<OutputQueue>,
    samples: Mutex<Vec<usize>>,
    fail_adds: bool,
    add_attempts: AtomicUsize,
}

impl RecordingQueue {
    pub fn new(inner: Arc<OutputQueue>) -> Self {
        Self {
            inner,
            samples: Mutex::new(Vec::new()),
            fail_adds: false,
            add_attempts: AtomicUsize::new(0),
        }
    }

    /// Every `add` fails the way a lock-wait timeout does.
    pub fn with_failing_adds(inner: Arc<OutputQueue>) -> Self {
        Self {
            fail_adds: true,
            ..Self::new(inner)
        }
    }

    pub fn add_attempts(&self) -> usize {
        self.add_attempts.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> Vec<usize> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn max_sample(&self) -> usize {
        self.samples().into_iter().max().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl QueueRepository for RecordingQueue {
    async fn add(&self, key: &str) -> Result<bool> {
        self.add_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds {
            return Err(Error::storage(format!(
                "Failed to add to queue: database is locked ({key})"
            )));
        }
        let added = self.inner.add(key).await?;
        let pending = self.inner.count_pending().await?;
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(pending);
        }
        Ok(added)
    }

    async fn count_pending(&self) -> Result<usize> {
        self.inner.count_pending().await
    }

    async fn count_processing(&self) -> Result<usize> {
        self.inner.count_processing().await
    }

    async fn stats(&self) -> Result<QueueStats> {
        self.inner.stats().await
    }

    async fn pending_keys(&self) -> Result<Vec<(String, f64)>> {
        self.inner.pending_keys().await
    }

    async fn next_pending(&self) -> Result<Option<String>> {
        self.inner.next_pending().await
    }

    async fn get(&self, key: &str) -> Result<Option<QueueItem>> {
        self.inner.get(key).await
    }

    async fn list(&self, filter_status: Option<QueueStatus>) -> Result<Vec<QueueItem>> {
        self.inner.list(filter_status).await
    }

    async fn mark_processing(&self, key: &str) -> Result<bool> {
        self.inner.mark_processing(key).await
    }

    async fn mark_completed(&self, key: &str) -> Result<()> {
        self.inner.mark_completed(key).await
    }

    async fn sweep_missing(
        &self,
        exists: &(dyn for<'p> Fn(&'p Path) -> bool + Send + Sync),
    ) -> Result<usize> {
        self.inner.sweep_missing(exists).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONSUMER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Claim and complete the oldest pending key, if any.
pub async fn consume_one(queue: &dyn QueueRepository) -> Result<Option<String>> {
    let Some(key) = queue.next_pending().await? else {
        return Ok(None);
    };
    if queue.mark_processing(&key).await? {
        queue.mark_completed(&key).await?;
        Ok(Some(key))
    } else {
        Ok(None)
    }
}
