//! The producer pipeline.
//!
//! ```text
//! ItemSource --chunk--> BatchCoordinator --item--> WorkerPool
//!                                                    |  admission wait
//!                                                    |  ArtifactProducer::produce
//!                                                    |  ArtifactWriter::write
//!                                                    v  OutputQueue::add
//!                                               ItemOutcome --> RunStatistics
//! ```

pub mod artifact;
pub mod batch;
pub mod collaborators;
pub mod item;
pub mod outcome;
pub mod stats;
pub mod worker;

pub use artifact::{Artifact, ArtifactMetadata};
pub use batch::{BatchCoordinator, ChunkProgress};
pub use collaborators::{
    ArtifactProducer, ArtifactWriter, BatchWriter, ItemSource, OutputSink, SourceSize, VecSource,
};
pub use item::{BBox, Geometry, Point, WorkItem};
pub use outcome::{ItemOutcome, OutcomeStatus};
pub use stats::{ModalityOutcome, ModalityReport, RunStatistics, RunSummary};
pub use worker::{Produced, WorkerPool};
