//! Per-item outcomes reported by the worker pool.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Artifact written and newly queued.
    Queued { key: String },
    /// Artifact written; its key was already live in the queue.
    AlreadyQueued { key: String },
    /// Producer declined the item (e.g. non-point geometry).
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub label: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ItemOutcome {
    pub fn new(item_id: impl Into<String>, label: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            item_id: item_id.into(),
            label: label.into(),
            status,
        }
    }

    /// A file was written for this item.
    pub const fn succeeded(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Queued { .. } | OutcomeStatus::AlreadyQueued { .. }
        )
    }

    pub fn key(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Queued { key } | OutcomeStatus::AlreadyQueued { key } => Some(key),
            OutcomeStatus::Skipped { .. } | OutcomeStatus::Failed { .. } => None,
        }
    }
}
