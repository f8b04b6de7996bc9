//! Configuration validation and per-modality resolution

use std::{collections::HashSet, str::FromStr, time::Duration};

use super::types::{Config, GridConfig, ModalityConfig, OutputConfig, ResolvedOutput, SourceConfig};
use crate::{output::OutputFormat, pipeline::BBox, Error, Result};

/// Deepest zoom level slippy tile servers publish.
pub const MAX_ZOOM: u8 = 22;

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATION LOGIC
// ═══════════════════════════════════════════════════════════════════════════

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a config error for the first value out of range
    pub fn validate(&self) -> Result<()> {
        if self.run.batch_size == 0 {
            return Err(Error::config("run.batch_size must be at least 1"));
        }
        if self.run.num_workers == 0 {
            return Err(Error::config("run.num_workers must be at least 1"));
        }
        if self.queue.max_unprocessed == 0 {
            return Err(Error::config("queue.max_unprocessed must be at least 1"));
        }
        if self.queue.poll_interval_ms == 0 {
            return Err(Error::config("queue.poll_interval_ms must be positive"));
        }
        if self.queue.db_path.as_os_str().is_empty() {
            return Err(Error::config("queue.db_path cannot be empty"));
        }

        match &self.source {
            None => {
                return Err(Error::config(
                    "No source configured: add a [source] table with type = \"file\" or \"grid\"",
                ))
            }
            Some(SourceConfig::File(file)) => {
                if file.id_column.trim().is_empty() || file.label_column.trim().is_empty() {
                    return Err(Error::config("source.id_column and source.label_column cannot be empty"));
                }
            }
            Some(SourceConfig::Grid(grid)) => grid.validate()?,
        }

        let mut names = HashSet::new();
        for modality in &self.modalities {
            modality.validate()?;
            if !names.insert(modality.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate modality name '{}'",
                    modality.name
                )));
            }
        }

        Ok(())
    }

    /// Output settings for `modality`: its own table, else the global one,
    /// else defaults. With several modalities each writes under
    /// `<dir>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns a config error for an unsupported format
    pub fn output_for(&self, modality: &ModalityConfig) -> Result<ResolvedOutput> {
        let output = modality
            .output
            .clone()
            .or_else(|| self.output.clone())
            .unwrap_or_default();
        let OutputConfig {
            format,
            dir,
            crs,
            compress,
        } = output;

        let format = OutputFormat::from_str(&format)?;
        let dir = if self.modalities.len() > 1 {
            dir.join(&modality.name)
        } else {
            dir
        };

        Ok(ResolvedOutput {
            format,
            dir,
            crs,
            compression: compress,
        })
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue.poll_interval_ms)
    }

    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.busy_timeout_secs)
    }
}

impl GridConfig {
    /// The configured bbox, if any.
    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
            .map(|[minx, miny, maxx, maxy]| BBox::new(minx, miny, maxx, maxy))
    }

    fn validate(&self) -> Result<()> {
        if self.bbox.is_none() && self.region.is_none() {
            return Err(Error::config(
                "Either 'bbox' or a region filter (path, column, value) must be provided in grid configuration",
            ));
        }
        if let Some(bbox) = self.bbox() {
            if bbox.minx >= bbox.maxx || bbox.miny >= bbox.maxy {
                return Err(Error::config(format!(
                    "Invalid grid bbox {bbox}: minx < maxx and miny < maxy required"
                )));
            }
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(Error::config(format!(
                "Grid spacing must be positive, got {}",
                self.spacing
            )));
        }
        if let Some(region) = &self.region {
            if region.column.trim().is_empty() || region.value.trim().is_empty() {
                return Err(Error::config("Region filter column and value cannot be empty"));
            }
        }
        Ok(())
    }
}

impl ModalityConfig {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Modality name cannot be empty"));
        }
        if self.zoom_level > MAX_ZOOM {
            return Err(Error::config(format!(
                "Modality '{}': zoom_level must be 0-{MAX_ZOOM}, got {}",
                self.name, self.zoom_level
            )));
        }
        if !(self.bbox_size.is_finite() && self.bbox_size > 0.0) {
            return Err(Error::config(format!(
                "Modality '{}': bbox_size must be positive, got {}",
                self.name, self.bbox_size
            )));
        }
        Ok(())
    }
}
