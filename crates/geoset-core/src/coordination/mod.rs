//! Durable output queue and admission control.
//!
//! The queue is the only state shared between the producer and an external
//! consumer. Rows are added after an artifact is written, claimed by the
//! consumer with a compare-and-swap on `status`, and deleted on completion.

pub mod admission;
pub mod queue;
pub mod queue_entities;
pub mod queue_repository;
pub mod queue_status;

pub use admission::{AdmissionController, CeilingPolicy, DEFAULT_POLL_INTERVAL};
pub use queue::{queue_key, OutputQueue, DEFAULT_BUSY_TIMEOUT};
pub use queue_entities::{QueueItem, QueueStats};
pub use queue_repository::QueueRepository;
pub use queue_status::QueueStatus;
