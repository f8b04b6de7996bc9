#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Batched runs: one container per pass, registered as a single queue key.

mod common;

use std::sync::Arc;

use common::{open_queue, points, BrokenBatchWriter, FakeProducer, FAST_POLL};
use geoset_core::{
    output::ArchiveWriter,
    pipeline::{Geometry, VecSource},
    AdmissionController, BatchCoordinator, OutputSink, QueueRepository, Result, WorkItem,
    WorkerPool,
};

fn coordinator(queue: Arc<dyn QueueRepository>, producer: Arc<FakeProducer>) -> BatchCoordinator {
    let admission = Arc::new(AdmissionController::new(queue, 5).with_poll_interval(FAST_POLL));
    BatchCoordinator::new(WorkerPool::new(admission, producer, 2), 2)
}

fn mixed_items() -> Vec<WorkItem> {
    let mut items = points(4);
    items.push(WorkItem::new(
        "road",
        "site",
        Geometry::Other {
            kind: "LineString".to_string(),
        },
    ));
    items
}

#[tokio::test]
async fn archive_run_queues_one_container() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let queue = open_queue(dir.path()).await?;
    let producer = Arc::new(FakeProducer::failing_on(&["3"]));
    let writer = Arc::new(ArchiveWriter::new(&dir.path().join("out"), "satellite")?);
    let run = coordinator(queue.clone(), producer);

    let stats = run
        .run(&VecSource::new(mixed_items()), &OutputSink::Batched(writer.clone()))
        .await?;

    assert_eq!(stats.attempted, 5);
    assert_eq!(stats.saved, 3);
    assert_eq!(stats.queued + stats.already_queued, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.chunks, 3);

    assert!(writer.path().exists());
    assert_eq!(queue.count_pending().await?, 1);
    let key = queue.next_pending().await?.unwrap_or_default();
    assert!(key.ends_with("satellite.tar.gz"));
    Ok(())
}

#[tokio::test]
async fn failed_container_write_fails_every_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let queue = open_queue(dir.path()).await?;
    let producer = Arc::new(FakeProducer::default());
    let run = coordinator(queue.clone(), producer);

    let stats = run
        .run(
            &VecSource::new(points(3)),
            &OutputSink::Batched(Arc::new(BrokenBatchWriter)),
        )
        .await?;

    assert_eq!(stats.failed, 3);
    assert_eq!(stats.saved, 0);
    assert_eq!(queue.count_pending().await?, 0);
    Ok(())
}

#[tokio::test]
async fn nothing_produced_writes_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let queue = open_queue(dir.path()).await?;
    let producer = Arc::new(FakeProducer::failing_on(&["1", "2"]));
    let writer = Arc::new(ArchiveWriter::new(dir.path(), "empty")?);
    let run = coordinator(queue.clone(), producer);

    let stats = run
        .run(&VecSource::new(points(2)), &OutputSink::Batched(writer.clone()))
        .await?;

    assert_eq!(stats.failed, 2);
    assert!(!writer.path().exists());
    assert_eq!(queue.count_pending().await?, 0);
    Ok(())
}
