//! Replay: draining the spill queue back into the ledger store.

use crate::spill::{SpillError, SpillQueue, SpilledRecord};
use crate::{LedgerStore, activity_row};

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Records confirmed appended and removed from the queue.
    pub redelivered: usize,
    /// Records still queued for the next drain.
    pub remaining: usize,
}

/// Drains the spill queue: one direct append attempt per record, failures
/// kept in their original order for the next pass.
///
/// A record leaves the queue if and only if its append was confirmed. An
/// unreadable queue file is quarantined rather than guessed at, and the
/// drain reports an empty pass.
pub async fn drain<S: LedgerStore>(
    store: &S,
    table: &str,
    queue: &SpillQueue,
) -> Result<DrainReport, SpillError> {
    let spilled = match queue.load() {
        Ok(records) => records,
        Err(SpillError::Corrupt { path, source }) => {
            let quarantined = queue.quarantine()?;
            tracing::error!(
                queue = %path.display(),
                quarantined = %quarantined.display(),
                error = %source,
                "spill queue unreadable, quarantined"
            );
            return Ok(DrainReport {
                redelivered: 0,
                remaining: 0,
            });
        }
        Err(err) => return Err(err),
    };

    if spilled.is_empty() {
        tracing::debug!("spill queue empty, nothing to drain");
        return Ok(DrainReport {
            redelivered: 0,
            remaining: 0,
        });
    }

    let mut kept: Vec<SpilledRecord> = Vec::new();
    let mut redelivered = 0usize;
    for entry in spilled {
        match store.append_row(table, &activity_row(&entry.record)).await {
            Ok(()) => {
                tracing::info!(
                    participant = %entry.record.participant.id,
                    date = %entry.record.date,
                    "spilled record redelivered"
                );
                redelivered += 1;
            }
            Err(err) => {
                tracing::warn!(
                    participant = %entry.record.participant.id,
                    error = %err,
                    "redelivery failed, keeping record queued"
                );
                kept.push(entry);
            }
        }
    }

    let remaining = kept.len();
    queue.replace(&kept)?;
    Ok(DrainReport {
        redelivered,
        remaining,
    })
}
