//! Default values

use std::path::PathBuf;

use super::types::{OutputConfig, QueueConfig, RunConfig};
use crate::coordination::CeilingPolicy;

pub const DEFAULT_MAX_UNPROCESSED: usize = 10;
pub const DEFAULT_QUEUE_DB: &str = "output_queue.db";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_NUM_WORKERS: usize = 1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;

pub fn id_column() -> String {
    "id".to_string()
}

pub fn label_column() -> String {
    "label".to_string()
}

pub fn modality_kind() -> String {
    "tms".to_string()
}

pub const fn bbox_size() -> f64 {
    0.001
}

pub const fn zoom_level() -> u8 {
    18
}

pub const fn blank_on_fetch_error() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_unprocessed: DEFAULT_MAX_UNPROCESSED,
            db_path: PathBuf::from(DEFAULT_QUEUE_DB),
            ceiling: CeilingPolicy::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "tif".to_string(),
            dir: PathBuf::from("output"),
            crs: "EPSG:4326".to_string(),
            compress: crate::output::Compression::Lzw,
        }
    }
}
