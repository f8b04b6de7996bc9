//! Admission control: gate production against the `max_unprocessed` ceiling.
//!
//! The consumer draining the queue is an independent, possibly
//! out-of-process entity with no shared signaling channel, so waiting is a
//! sleep-poll against the durable count. A consumer that never drains stalls
//! the producer indefinitely; that is the backpressure.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use super::queue_repository::QueueRepository;
use crate::{shutdown::ShutdownToken, Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Which rows count against the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeilingPolicy {
    /// Only `pending` rows. A consumer's claimed rows free their slot.
    #[default]
    Pending,
    /// `pending + processing`: every row not yet removed.
    Unprocessed,
}

impl CeilingPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Unprocessed => "unprocessed",
        }
    }
}

impl fmt::Display for CeilingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CeilingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "unprocessed" => Ok(Self::Unprocessed),
            other => Err(Error::config(format!(
                "Unknown ceiling policy '{other}' (expected 'pending' or 'unprocessed')"
            ))),
        }
    }
}

pub struct AdmissionController {
    queue: Arc<dyn QueueRepository>,
    max_unprocessed: usize,
    policy: CeilingPolicy,
    poll_interval: Duration,
    shutdown: ShutdownToken,
}

impl AdmissionController {
    pub fn new(queue: Arc<dyn QueueRepository>, max_unprocessed: usize) -> Self {
        Self {
            queue,
            max_unprocessed,
            policy: CeilingPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: ShutdownToken::never(),
        }
    }

    pub const fn with_policy(mut self, policy: CeilingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn queue(&self) -> &Arc<dyn QueueRepository> {
        &self.queue
    }

    pub const fn max_unprocessed(&self) -> usize {
        self.max_unprocessed
    }

    pub const fn policy(&self) -> CeilingPolicy {
        self.policy
    }

    pub fn shutdown(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Rows counted against the ceiling under the configured policy.
    pub async fn outstanding(&self) -> Result<usize> {
        match self.policy {
            CeilingPolicy::Pending => self.queue.count_pending().await,
            CeilingPolicy::Unprocessed => self.queue.count_unprocessed().await,
        }
    }

    pub async fn can_produce(&self) -> Result<bool> {
        Ok(self.outstanding().await? < self.max_unprocessed)
    }

    /// Block until the ceiling admits one more artifact.
    ///
    /// Re-polls every `poll_interval`. Returns [`Error::Cancelled`] as soon as
    /// shutdown is requested; storage errors propagate.
    pub async fn wait_until_can_produce(&self) -> Result<()> {
        let mut shutdown = self.shutdown.clone();
        let mut blocked = false;

        loop {
            shutdown.check("waiting for queue capacity")?;

            let outstanding = self.outstanding().await?;
            if outstanding < self.max_unprocessed {
                if blocked {
                    tracing::info!(
                        outstanding,
                        max_unprocessed = self.max_unprocessed,
                        "Queue drained, resuming production"
                    );
                }
                return Ok(());
            }

            if !blocked {
                tracing::info!(
                    outstanding,
                    max_unprocessed = self.max_unprocessed,
                    policy = %self.policy,
                    "Waiting: {outstanding} unprocessed outputs (max: {})",
                    self.max_unprocessed
                );
                blocked = true;
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                () = shutdown.cancelled() => {
                    return Err(Error::cancelled("waiting for queue capacity"));
                }
            }
        }
    }
}
