//! Reliable delivery of attendance records: retry, backoff, spill.

use std::time::Duration;

use chrono::Utc;

use rc_core::ActivityRecord;

use crate::spill::{SpillError, SpillQueue, SpilledRecord};
use crate::{LedgerStore, activity_row};

/// Retry budget for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total append attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// How a submission ended. Spilling is a designed outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The record is durably in the ledger store.
    Acknowledged,
    /// The record is durably in the spill queue, awaiting replay.
    Spilled,
}

/// Wraps ledger appends with retry, exponential backoff, and spill-on-
/// exhaustion.
///
/// `submit` terminates in `Acknowledged` or `Spilled` for every record; the
/// only error it surfaces is a spill-queue write failure, at which point the
/// record truly has nowhere durable to go.
#[derive(Debug)]
pub struct ReliableSink<S> {
    store: S,
    table: String,
    queue: SpillQueue,
    retry: RetryPolicy,
}

impl<S: LedgerStore> ReliableSink<S> {
    pub fn new(store: S, table: impl Into<String>, queue: SpillQueue, retry: RetryPolicy) -> Self {
        Self {
            store,
            table: table.into(),
            queue,
            retry,
        }
    }

    /// Delivers one record, retrying transport failures and spilling to
    /// disk when the retry budget is exhausted.
    pub async fn submit(&self, record: ActivityRecord) -> Result<Submission, SpillError> {
        let row = activity_row(&record);
        let mut delay = self.retry.base_delay;

        for attempt in 1..=self.retry.max_attempts.max(1) {
            match self.store.append_row(&self.table, &row).await {
                Ok(()) => {
                    tracing::info!(
                        participant = %record.participant.id,
                        attempt,
                        "attendance record acknowledged"
                    );
                    return Ok(Submission::Acknowledged);
                }
                Err(err) => {
                    tracing::warn!(
                        participant = %record.participant.id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "ledger append failed"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        let spilled = SpilledRecord {
            record,
            failed_at: Utc::now(),
        };
        self.queue.push(spilled)?;
        tracing::error!(
            queue = %self.queue.path().display(),
            "retry budget exhausted, record spilled to disk"
        );
        Ok(Submission::Spilled)
    }
}
