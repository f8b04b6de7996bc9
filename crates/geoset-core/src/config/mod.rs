//! Configuration loading and management
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `~/.config/geoset/config.toml`
//! 3. Project config: `./geoset.toml`, or the file given with `--config`
//! 4. Environment variables: `GEOSET_*`
//! 5. CLI flags (`--max-unprocessed`, `--queue-db`, ...)
//!
//! Everything is validated once, before any queue or worker activity.
//!
//! # Example Config
//!
//! ```toml
//! [run]
//! batch_size = 100
//! num_workers = 3
//!
//! [queue]
//! max_unprocessed = 10
//! db_path = "output_queue.db"
//!
//! [source]
//! type = "grid"
//! bbox = [28.9, 41.0, 29.1, 41.1]
//! spacing = 0.01
//!
//! [output]
//! format = "tif"
//! dir = "output"
//!
//! [[modalities]]
//! name = "satellite"
//! bbox_size = 0.0025
//! zoom_level = 18
//! tile_server = "google"
//! ```

mod defaults;
mod load;
mod merge;
mod types;
mod validate;

#[cfg(test)]
mod tests_loading;
#[cfg(test)]
mod tests_validation;

pub use load::{
    global_config_path, load_config, load_toml_table, project_config_path, PROJECT_CONFIG_NAME,
};
pub use merge::merge_tables;
pub use types::{
    Config, FileSourceConfig, GridConfig, ModalityConfig, OutputConfig, Overrides, QueueConfig,
    RegionConfig, ResolvedOutput, RunConfig, SourceConfig,
};
