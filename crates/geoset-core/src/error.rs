//! Error types for Geoset with categorization:
//!
//! - **Configuration errors**: invalid or missing settings, fatal at startup (exit code 1)
//! - **Item errors**: produce/write failures for one work item (exit code 2)
//! - **Storage errors**: queue database I/O or lock timeout, fatal for a run (exit code 4)
//!
//! Item errors never cross the worker pool boundary; they are folded into
//! [`ItemOutcome`](crate::pipeline::ItemOutcome) records. A duplicate queue key
//! is not an error at all: `add` reports it as `false`.

use thiserror::Error;

/// Core error type for Geoset operations
#[derive(Debug, Error)]
pub enum Error {
    /// Queue store I/O, corruption or lock-wait timeout
    #[error("Storage error: {0}")]
    Storage(String),

    /// Collaborator failed to fetch or render an artifact
    #[error("Produce error: {0}")]
    Produce(String),

    /// Artifact could not be persisted
    #[error("Write error: {0}")]
    Write(String),

    /// Missing or invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem error outside the queue store
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed input data (GeoJSON, TOML, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The process received a shutdown signal
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for Geoset operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn produce(msg: impl Into<String>) -> Self {
        Self::Produce(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Whether this error ends the whole run rather than one work item.
    ///
    /// Everything else raised while handling an item is folded into that
    /// item's outcome.
    pub const fn aborts_run(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Cancelled(_))
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit code scheme:
    /// - 1: Configuration or input error
    /// - 2: Item-level or filesystem error
    /// - 4: Queue store failure
    /// - 130: Interrupted by signal
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Produce(_) | Self::Write(_) | Self::Io(_) => 2,
            Self::Storage(_) => 4,
            Self::Cancelled(_) => 130,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse config: {err}"))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_storage() {
        let err = Error::storage("database is locked");
        assert_eq!(err.to_string(), "Storage error: database is locked");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::config("batch_size must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: batch_size must be at least 1"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_sqlx_is_storage() {
        let err = Error::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_only_storage_and_cancel_abort_a_run() {
        assert!(Error::storage("locked").aborts_run());
        assert!(Error::cancelled("SIGINT").aborts_run());
        assert!(!Error::produce("timeout").aborts_run());
        assert!(!Error::write("disk full").aborts_run());
        assert!(!Error::io("permission denied").aborts_run());
        assert!(!Error::parse("bad tile").aborts_run());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::config("x").exit_code(), 1);
        assert_eq!(Error::parse("x").exit_code(), 1);
        assert_eq!(Error::produce("x").exit_code(), 2);
        assert_eq!(Error::write("x").exit_code(), 2);
        assert_eq!(Error::io("x").exit_code(), 2);
        assert_eq!(Error::storage("x").exit_code(), 4);
        assert_eq!(Error::cancelled("x").exit_code(), 130);
    }
}
