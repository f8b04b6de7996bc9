//! Batch coordinator: drive the worker pool over an item source in
//! fixed-size chunks, reporting progress and folding outcomes into totals.
//!
//! A chunk is a progress and memory-bounding unit, not a transaction: a
//! partially failed chunk is never rolled back. Chunk `N + 1` is not pulled
//! from the source until every item of chunk `N` has resolved.
//!
//! # Batched output
//!
//! A [`BatchWriter`] has no incremental append, so every successful artifact
//! of the run is buffered in memory until the pass completes and `write_all`
//! is called once. Datasets whose images do not fit in memory at the same
//! time must use per-item output instead.

use std::sync::Arc;

use super::{
    artifact::Artifact,
    collaborators::{ArtifactWriter, BatchWriter, ItemSource, OutputSink, SourceSize},
    item::WorkItem,
    outcome::{ItemOutcome, OutcomeStatus},
    stats::RunStatistics,
    worker::{guarded, Produced, WorkerPool},
};
use crate::{coordination::queue_key, Error, Result};

/// Snapshot passed to the progress callback after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// 1-based chunk number.
    pub chunk: usize,
    /// Items pulled from the source so far.
    pub processed: usize,
    pub expected: SourceSize,
    pub chunk_stats: RunStatistics,
    /// Cumulative totals including this chunk.
    pub totals: RunStatistics,
}

pub struct BatchCoordinator {
    pool: WorkerPool,
    batch_size: usize,
}

impl BatchCoordinator {
    /// `batch_size` of 0 is treated as 1.
    pub fn new(pool: WorkerPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub async fn run(&self, source: &dyn ItemSource, sink: &OutputSink) -> Result<RunStatistics> {
        self.run_with_progress(source, sink, |_| {}).await
    }

    /// Run the whole source through the pipeline.
    ///
    /// Storage errors and cancellation abort the run; the callback has
    /// already seen the totals of every finished chunk.
    pub async fn run_with_progress<F>(
        &self,
        source: &dyn ItemSource,
        sink: &OutputSink,
        on_chunk: F,
    ) -> Result<RunStatistics>
    where
        F: FnMut(&ChunkProgress) + Send,
    {
        let expected = source.size_hint();
        tracing::info!(
            expected = %expected,
            batch_size = self.batch_size,
            num_workers = self.pool.num_workers(),
            max_unprocessed = self.pool.admission().max_unprocessed(),
            "Starting run"
        );

        let stats = match sink {
            OutputSink::PerItem(writer) => {
                self.run_per_item(source, writer, expected, on_chunk).await?
            }
            OutputSink::Batched(writer) => {
                self.run_batched(source, writer, expected, on_chunk).await?
            }
        };

        tracing::info!(
            attempted = stats.attempted,
            saved = stats.saved,
            queued = stats.queued,
            skipped = stats.skipped,
            failed = stats.failed,
            "Run complete"
        );
        Ok(stats)
    }

    fn next_chunk(&self, items: &mut impl Iterator<Item = WorkItem>) -> Vec<WorkItem> {
        items.by_ref().take(self.batch_size).collect()
    }

    fn finish_chunk<F>(
        chunk_stats: RunStatistics,
        totals: &mut RunStatistics,
        processed: usize,
        expected: SourceSize,
        on_chunk: &mut F,
    ) where
        F: FnMut(&ChunkProgress),
    {
        let chunk_stats = RunStatistics {
            chunks: 1,
            ..chunk_stats
        };
        *totals += chunk_stats;
        let progress = ChunkProgress {
            chunk: totals.chunks,
            processed,
            expected,
            chunk_stats,
            totals: *totals,
        };
        tracing::info!(
            chunk = progress.chunk,
            processed,
            expected = %expected,
            saved = chunk_stats.saved,
            failed = chunk_stats.failed,
            "Chunk complete"
        );
        on_chunk(&progress);
    }

    async fn run_per_item<F>(
        &self,
        source: &dyn ItemSource,
        writer: &Arc<dyn ArtifactWriter>,
        expected: SourceSize,
        mut on_chunk: F,
    ) -> Result<RunStatistics>
    where
        F: FnMut(&ChunkProgress) + Send,
    {
        let shutdown = self.pool.admission().shutdown();
        let mut items = source.items();
        let mut totals = RunStatistics::default();
        let mut processed = 0;

        loop {
            shutdown.check("between chunks")?;
            let chunk = self.next_chunk(&mut items);
            if chunk.is_empty() {
                break;
            }
            processed += chunk.len();

            let outcomes = self.pool.run_chunk(chunk, writer.as_ref()).await?;
            let chunk_stats = RunStatistics::from_outcomes(&outcomes);
            Self::finish_chunk(chunk_stats, &mut totals, processed, expected, &mut on_chunk);
        }

        Ok(totals)
    }

    async fn run_batched<F>(
        &self,
        source: &dyn ItemSource,
        writer: &Arc<dyn BatchWriter>,
        expected: SourceSize,
        mut on_chunk: F,
    ) -> Result<RunStatistics>
    where
        F: FnMut(&ChunkProgress) + Send,
    {
        let admission = self.pool.admission();
        let shutdown = admission.shutdown();
        // The whole pass becomes one queue row, so the ceiling is checked once.
        admission.wait_until_can_produce().await?;

        let mut items = source.items();
        let mut records: Vec<(WorkItem, Artifact)> = Vec::new();
        let mut totals = RunStatistics::default();
        let mut processed = 0;

        loop {
            shutdown.check("between chunks")?;
            let chunk = self.next_chunk(&mut items);
            if chunk.is_empty() {
                break;
            }
            processed += chunk.len();

            let mut chunk_stats = RunStatistics::default();
            for produced in self.pool.produce_chunk(chunk).await? {
                match produced {
                    Produced::Ready(item, artifact) => records.push((item, artifact)),
                    Produced::Done(outcome) => chunk_stats.record(&outcome),
                }
            }
            Self::finish_chunk(chunk_stats, &mut totals, processed, expected, &mut on_chunk);
            tracing::debug!(buffered = records.len(), "Artifacts buffered for batched write");
        }

        if records.is_empty() {
            tracing::warn!("No artifacts produced, skipping batched write");
            return Ok(totals);
        }

        shutdown.check("before batched write")?;
        tracing::info!(records = records.len(), "Writing batched output");

        let status = match guarded(writer.write_all(&records), Error::Write).await {
            Ok(path) => {
                let key = queue_key(&path);
                if admission.queue().add(&key).await? {
                    tracing::info!(key = %key, records = records.len(), "Batched output queued");
                    OutcomeStatus::Queued { key }
                } else {
                    tracing::info!(key = %key, "Batched output already queued");
                    OutcomeStatus::AlreadyQueued { key }
                }
            }
            Err(err) if err.aborts_run() => return Err(err),
            Err(err) => {
                tracing::error!(error = %err, records = records.len(), "Batched write failed");
                OutcomeStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };

        for (item, _) in &records {
            totals.record(&ItemOutcome::new(
                item.id.clone(),
                item.label.clone(),
                status.clone(),
            ));
        }
        Ok(totals)
    }
}
