//! # Geoset Core
//!
//! Core functionality for Geoset: a bounded, durable producer pipeline that
//! turns annotated geographic points into imagery artifacts.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//! - No `todo!()` / `unimplemented!()` - complete implementations only
//!
//! ## Layout
//!
//! - [`coordination`]: the durable output queue and admission control
//! - [`pipeline`]: work items, collaborator traits, the worker pool and the batch coordinator
//! - [`geo`]: item sources and the TMS artifact producer
//! - [`output`]: per-item and batched artifact writers
//! - [`config`]: typed, layered configuration
//! - [`shutdown`]: signal handling fanned out to the pipeline

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordination;
mod error;
pub mod geo;
pub mod output;
pub mod pipeline;
pub mod shutdown;

pub use config::Config;
pub use coordination::{
    queue_key, AdmissionController, CeilingPolicy, OutputQueue, QueueItem, QueueRepository,
    QueueStats, QueueStatus,
};
pub use error::{Error, Result};
pub use pipeline::{
    ArtifactProducer, ArtifactWriter, BatchCoordinator, BatchWriter, ItemOutcome, ItemSource,
    OutcomeStatus, OutputSink, RunStatistics, WorkItem, WorkerPool,
};
pub use shutdown::ShutdownCoordinator;
