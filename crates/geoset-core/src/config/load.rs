//! Configuration loading from files and environment
//!
//! Layers are read as raw TOML tables, merged, then deserialized once so
//! serde defaults fill whatever no layer sets.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use super::{
    merge::merge_tables,
    types::{Config, Overrides},
};
use crate::{Error, Result};

pub const PROJECT_CONFIG_NAME: &str = "geoset.toml";

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from all sources with hierarchy
///
/// `explicit` replaces the project file lookup and must exist.
///
/// # Errors
///
/// Returns error if:
/// - A config file is unreadable or malformed TOML
/// - An environment variable holds an invalid value
/// - The merged result fails validation
pub fn load_config(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    // 1. Defaults come from serde
    let table = Table::new();

    // 2. Global config if present
    let table = match global_config_path() {
        Some(path) if path.is_file() => merge_tables(table, load_toml_table(&path)?),
        _ => table,
    };

    // 3. Explicit or project config
    let table = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            merge_tables(table, load_toml_table(path)?)
        }
        None => {
            let path = project_config_path()?;
            if path.is_file() {
                merge_tables(table, load_toml_table(&path)?)
            } else {
                table
            }
        }
    };

    let config = Config::from_table(table)?;

    // 4. Environment, 5. CLI flags
    let config = config.apply_env_vars()?.apply_overrides(overrides);

    config.validate()?;
    Ok(config)
}

// ═══════════════════════════════════════════════════════════════════════════
// PATH HELPERS
// ═══════════════════════════════════════════════════════════════════════════

/// Get path to global config file
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "geoset")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Get path to project config file
///
/// # Errors
///
/// Returns error if current directory cannot be determined
pub fn project_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(PROJECT_CONFIG_NAME))
        .map_err(|e| Error::io(format!("Failed to get current directory: {e}")))
}

/// Read a TOML file as a raw table
///
/// # Errors
///
/// Returns error if the path is a directory, cannot be read, or is not valid TOML
pub fn load_toml_table(path: &Path) -> Result<Table> {
    if path.is_dir() {
        return Err(Error::config(format!(
            "Config path is a directory, not a file: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read config file {}: {e}", path.display())))?;

    content
        .parse::<Table>()
        .map_err(|e| Error::parse(format!("Failed to parse config file {}: {e}", path.display())))
}

impl Config {
    /// Deserialize a merged table
    ///
    /// # Errors
    ///
    /// Returns a config error naming the offending key
    pub fn from_table(table: Table) -> Result<Self> {
        Value::Table(table)
            .try_into::<Self>()
            .map_err(|e| Error::config(format!("Invalid configuration: {e}")))
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or has invalid values
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table = content
            .parse::<Table>()
            .map_err(|e| Error::parse(format!("Failed to parse config: {e}")))?;
        Self::from_table(table)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENVIRONMENT VARIABLE AND CLI OVERRIDES
// ═══════════════════════════════════════════════════════════════════════════

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid {name} value '{value}': {e}")))
}

impl Config {
    /// Apply `GEOSET_*` environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns error if environment variable values are invalid
    pub fn apply_env_vars(self) -> Result<Self> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("GEOSET_MAX_UNPROCESSED") {
            self.queue.max_unprocessed = parse_env("GEOSET_MAX_UNPROCESSED", &value)?;
        }

        if let Some(value) = lookup("GEOSET_QUEUE_DB") {
            if value.trim().is_empty() {
                return Err(Error::config(
                    "GEOSET_QUEUE_DB cannot be empty - unset the variable or provide a path",
                ));
            }
            self.queue.db_path = PathBuf::from(value);
        }

        if let Some(value) = lookup("GEOSET_BATCH_SIZE") {
            self.run.batch_size = parse_env("GEOSET_BATCH_SIZE", &value)?;
        }

        if let Some(value) = lookup("GEOSET_NUM_WORKERS") {
            self.run.num_workers = parse_env("GEOSET_NUM_WORKERS", &value)?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn apply_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(max) = overrides.max_unprocessed {
            self.queue.max_unprocessed = max;
        }
        if let Some(path) = &overrides.queue_db {
            self.queue.db_path.clone_from(path);
        }
        if let Some(size) = overrides.batch_size {
            self.run.batch_size = size;
        }
        if let Some(workers) = overrides.num_workers {
            self.run.num_workers = workers;
        }
        self
    }
}
