//! Queue row status (pure domain logic, no database imports).
//!
//! ```text
//! pending -> processing -> (row deleted)
//!     |
//!     +-----------------> (row deleted)
//! ```
//!
//! There is no terminal "done" state: completion removes the row.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle state of a live queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Written by the producer, not yet claimed.
    Pending,
    /// Claimed by a consumer via `mark_processing`.
    Processing,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
        }
    }

    /// Whether a row in `self` may move to `target`.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Processing))
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            _ => Err(Error::storage(format!("Invalid queue status: {s}"))),
        }
    }
}

impl TryFrom<String> for QueueStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_str(&value)
    }
}
