//! Configuration type definitions
//!
//! Plain data holders. Enumerated fields parse through `FromStr`; the output
//! format stays a string until a modality resolves it, so an unsupported
//! format only skips that modality.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{coordination::CeilingPolicy, geo::TileServer, output::Compression};

// ═══════════════════════════════════════════════════════════════════════════
// MAIN CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// Root configuration structure
///
/// Loaded from defaults → global → project → env vars → CLI flags
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub queue: QueueConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,
    /// Global output settings; a modality's own `output` table wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
    pub modalities: Vec<ModalityConfig>,
}

// ═══════════════════════════════════════════════════════════════════════════
// NESTED CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    pub batch_size: usize,
    pub num_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    pub max_unprocessed: usize,
    pub db_path: PathBuf,
    pub ceiling: CeilingPolicy,
    pub poll_interval_ms: u64,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// GeoJSON feature file.
    File(FileSourceConfig),
    /// Generated point grid.
    Grid(GridConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSourceConfig {
    pub path: PathBuf,
    #[serde(default = "super::defaults::id_column")]
    pub id_column: String,
    #[serde(default = "super::defaults::label_column")]
    pub label_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    /// `[minx, miny, maxx, maxy]`; derived from `region` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub spacing: f64,
    #[serde(default)]
    pub start_id: u64,
    #[serde(default)]
    pub start_label: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionConfig>,
    /// Keep the grid lazy instead of materializing every point up front.
    #[serde(default)]
    pub incremental: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionConfig {
    pub path: PathBuf,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub dir: PathBuf,
    pub crs: String,
    pub compress: Compression,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalityConfig {
    pub name: String,
    #[serde(rename = "type", default = "super::defaults::modality_kind")]
    pub kind: String,
    #[serde(default = "super::defaults::bbox_size")]
    pub bbox_size: f64,
    #[serde(default = "super::defaults::zoom_level")]
    pub zoom_level: u8,
    #[serde(default)]
    pub tile_server: TileServer,
    #[serde(default = "super::defaults::blank_on_fetch_error")]
    pub blank_on_fetch_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

// ═══════════════════════════════════════════════════════════════════════════
// RESOLVED / OVERRIDE TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Output settings for one modality after fallback and format parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub format: crate::output::OutputFormat,
    pub dir: PathBuf,
    pub crs: String,
    pub compression: Compression,
}

/// CLI flag overrides; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub max_unprocessed: Option<usize>,
    pub queue_db: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub num_workers: Option<usize>,
}
