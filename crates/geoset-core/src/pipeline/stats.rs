//! Run statistics folded from item outcomes.

use std::{fmt, ops::AddAssign};

use serde::Serialize;

use super::outcome::{ItemOutcome, OutcomeStatus};

/// Totals for one coordinator run. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub attempted: usize,
    /// Items that produced a file (`queued + already_queued`).
    pub saved: usize,
    pub queued: usize,
    pub already_queued: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks: usize,
}

impl RunStatistics {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.attempted += 1;
        match outcome.status {
            OutcomeStatus::Queued { .. } => {
                self.saved += 1;
                self.queued += 1;
            }
            OutcomeStatus::AlreadyQueued { .. } => {
                self.saved += 1;
                self.already_queued += 1;
            }
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed { .. } => self.failed += 1,
        }
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a ItemOutcome>) -> Self {
        outcomes.into_iter().fold(Self::default(), |mut stats, outcome| {
            stats.record(outcome);
            stats
        })
    }
}

impl AddAssign for RunStatistics {
    fn add_assign(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.saved += other.saved;
        self.queued += other.queued;
        self.already_queued += other.already_queued;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.chunks += other.chunks;
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted {}, saved {} ({} newly queued), skipped {}, failed {}",
            self.attempted, self.saved, self.queued, self.skipped, self.failed
        )
    }
}

/// How a modality's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModalityOutcome {
    Completed,
    /// The run aborted (storage or config error); stats cover work done so far.
    Aborted { error: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalityReport {
    pub name: String,
    pub stats: RunStatistics,
    #[serde(flatten)]
    pub outcome: ModalityOutcome,
}

impl ModalityReport {
    pub fn completed(name: impl Into<String>, stats: RunStatistics) -> Self {
        Self {
            name: name.into(),
            stats,
            outcome: ModalityOutcome::Completed,
        }
    }

    pub fn aborted(name: impl Into<String>, stats: RunStatistics, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats,
            outcome: ModalityOutcome::Aborted {
                error: error.into(),
            },
        }
    }

    pub fn cancelled(name: impl Into<String>, stats: RunStatistics) -> Self {
        Self {
            name: name.into(),
            stats,
            outcome: ModalityOutcome::Cancelled,
        }
    }
}

/// Every modality of one invocation plus the grand total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub modalities: Vec<ModalityReport>,
    pub total: RunStatistics,
}

impl RunSummary {
    pub fn push(&mut self, report: ModalityReport) {
        self.total += report.stats;
        self.modalities.push(report);
    }

    pub fn was_cancelled(&self) -> bool {
        self.modalities
            .iter()
            .any(|report| report.outcome == ModalityOutcome::Cancelled)
    }
}
