//! Interfaces the pipeline calls out to.
//!
//! Sources, producers and writers are swappable; the worker pool and batch
//! coordinator only see these traits.

use std::{fmt, path::PathBuf, sync::Arc};

use super::{artifact::Artifact, item::WorkItem};
use crate::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ITEM SOURCE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How many items a source expects to yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSize {
    /// Materialized list.
    Exact(usize),
    /// Lazy sequence; an upper estimate (e.g. grid points before filtering).
    Approx(usize),
}

impl fmt::Display for SourceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Approx(n) => write!(f, "~{n}"),
        }
    }
}

/// A finite, restartable sequence of work items.
pub trait ItemSource: Send + Sync {
    /// A fresh iterator from the start of the sequence.
    fn items(&self) -> Box<dyn Iterator<Item = WorkItem> + Send + '_>;

    fn size_hint(&self) -> SourceSize;
}

/// In-memory source, mostly for tests and small runs.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    items: Vec<WorkItem>,
}

impl VecSource {
    pub const fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }
}

impl ItemSource for VecSource {
    fn items(&self) -> Box<dyn Iterator<Item = WorkItem> + Send + '_> {
        Box::new(self.items.iter().cloned())
    }

    fn size_hint(&self) -> SourceSize {
        SourceSize::Exact(self.items.len())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PRODUCER AND WRITERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fetch/render one artifact. `Ok(None)` means the item is skipped.
#[async_trait::async_trait]
pub trait ArtifactProducer: Send + Sync {
    async fn produce(&self, item: &WorkItem) -> Result<Option<Artifact>>;
}

/// Persist one artifact per item. Called concurrently; must use distinct paths.
#[async_trait::async_trait]
pub trait ArtifactWriter: Send + Sync {
    async fn write(&self, artifact: &Artifact, id: &str, label: &str) -> Result<PathBuf>;
}

/// Persist every record of a run into one container. Called once per run.
#[async_trait::async_trait]
pub trait BatchWriter: Send + Sync {
    async fn write_all(&self, records: &[(WorkItem, Artifact)]) -> Result<PathBuf>;
}

/// Where a run's artifacts go.
#[derive(Clone)]
pub enum OutputSink {
    PerItem(Arc<dyn ArtifactWriter>),
    /// Buffers every artifact of the run in memory until `write_all`.
    Batched(Arc<dyn BatchWriter>),
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerItem(_) => f.write_str("OutputSink::PerItem"),
            Self::Batched(_) => f.write_str("OutputSink::Batched"),
        }
    }
}
