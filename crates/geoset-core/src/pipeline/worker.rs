//! Worker pool: run `produce -> write -> enqueue` for each item of a chunk
//! across `num_workers` concurrent tasks.
//!
//! Every item consults admission control before it starts. Slots are not
//! reserved, so with `W` workers the queue can overshoot the ceiling by at
//! most `W - 1` rows.
//!
//! Item-level failures (producer/writer errors, panics) become
//! [`OutcomeStatus::Failed`] and never touch sibling items. Storage errors
//! and cancellation abort the chunk.

use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::{stream, FutureExt, StreamExt, TryStreamExt};

use super::{
    artifact::Artifact,
    collaborators::{ArtifactProducer, ArtifactWriter},
    item::WorkItem,
    outcome::{ItemOutcome, OutcomeStatus},
};
use crate::{
    coordination::{queue_key, AdmissionController},
    Error, Result,
};

/// Result of producing an item for a batched writer.
#[derive(Debug)]
pub enum Produced {
    /// Artifact buffered, waiting for `write_all`.
    Ready(WorkItem, Artifact),
    /// Skipped or failed; nothing to write.
    Done(ItemOutcome),
}

pub struct WorkerPool {
    admission: Arc<AdmissionController>,
    producer: Arc<dyn ArtifactProducer>,
    num_workers: usize,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run a collaborator future, converting a panic into an item-level error.
pub(crate) async fn guarded<T>(
    fut: impl Future<Output = Result<T>>,
    on_panic: fn(String) -> Error,
) -> Result<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(on_panic(format!(
            "collaborator panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn failed(item: &WorkItem, stage: &str, err: &Error) -> ItemOutcome {
    tracing::warn!(item_id = %item.id, label = %item.label, stage, error = %err, "Item failed");
    ItemOutcome::new(
        item.id.clone(),
        item.label.clone(),
        OutcomeStatus::Failed {
            reason: err.to_string(),
        },
    )
}

fn skipped(item: &WorkItem) -> ItemOutcome {
    let reason = format!("no artifact for {} geometry", item.geometry.kind());
    tracing::debug!(item_id = %item.id, reason = %reason, "Item skipped");
    ItemOutcome::new(
        item.id.clone(),
        item.label.clone(),
        OutcomeStatus::Skipped { reason },
    )
}

impl WorkerPool {
    /// `num_workers` of 0 is treated as 1 (sequential).
    pub fn new(
        admission: Arc<AdmissionController>,
        producer: Arc<dyn ArtifactProducer>,
        num_workers: usize,
    ) -> Self {
        Self {
            admission,
            producer,
            num_workers: num_workers.max(1),
        }
    }

    pub const fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    async fn produce(&self, item: &WorkItem) -> Result<Option<Artifact>> {
        guarded(self.producer.produce(item), Error::Produce).await
    }

    /// Full per-item pipeline for per-item output.
    pub async fn process_item(
        &self,
        item: WorkItem,
        writer: &dyn ArtifactWriter,
    ) -> Result<ItemOutcome> {
        self.admission.wait_until_can_produce().await?;

        let artifact = match self.produce(&item).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return Ok(skipped(&item)),
            Err(err) if err.aborts_run() => return Err(err),
            Err(err) => return Ok(failed(&item, "produce", &err)),
        };

        let path = match guarded(writer.write(&artifact, &item.id, &item.label), Error::Write).await
        {
            Ok(path) => path,
            Err(err) if err.aborts_run() => return Err(err),
            Err(err) => return Ok(failed(&item, "write", &err)),
        };

        let key = queue_key(&path);
        let status = if self.admission.queue().add(&key).await? {
            tracing::debug!(item_id = %item.id, key = %key, "Saved and queued");
            OutcomeStatus::Queued { key }
        } else {
            tracing::debug!(item_id = %item.id, key = %key, "Saved, key already queued");
            OutcomeStatus::AlreadyQueued { key }
        };

        Ok(ItemOutcome::new(item.id, item.label, status))
    }

    /// Produce without persisting, for batched output.
    pub async fn produce_only(&self, item: WorkItem) -> Result<Produced> {
        self.admission.shutdown().check("producing item")?;
        match self.produce(&item).await {
            Ok(Some(artifact)) => Ok(Produced::Ready(item, artifact)),
            Ok(None) => Ok(Produced::Done(skipped(&item))),
            Err(err) if err.aborts_run() => Err(err),
            Err(err) => Ok(Produced::Done(failed(&item, "produce", &err))),
        }
    }

    /// Process one chunk; resolves once every item in it has finished.
    /// Completion order is unspecified when `num_workers > 1`.
    pub async fn run_chunk(
        &self,
        items: Vec<WorkItem>,
        writer: &dyn ArtifactWriter,
    ) -> Result<Vec<ItemOutcome>> {
        stream::iter(items)
            .map(|item| self.process_item(item, writer))
            .buffer_unordered(self.num_workers)
            .try_collect()
            .await
    }

    pub async fn produce_chunk(&self, items: Vec<WorkItem>) -> Result<Vec<Produced>> {
        stream::iter(items)
            .map(|item| self.produce_only(item))
            .buffer_unordered(self.num_workers)
            .try_collect()
            .await
    }
}
