//! Absence declarations: the pre-registered "I will not attend" facts.

use chrono::{DateTime, FixedOffset, NaiveDate};

use rc_core::{Participant, ParticipantId};

use crate::{LEDGER_TIME_FORMAT, LedgerError, LedgerStore};

/// Column positions in the absence table.
const COL_DATE: usize = 0;
const COL_PARTICIPANT_ID: usize = 1;

/// Read/write façade over the ledger's absence table.
///
/// Cutoff enforcement is the caller's job: the adapter records and reports
/// declarations, nothing more.
#[derive(Debug)]
pub struct AbsenceLedger<S> {
    store: S,
    table: String,
}

impl<S: LedgerStore> AbsenceLedger<S> {
    pub fn new(store: S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Appends an absence declaration for the given date.
    pub async fn declare(
        &self,
        participant: &Participant,
        date: NaiveDate,
        requested_at: DateTime<FixedOffset>,
    ) -> Result<(), LedgerError> {
        let row = vec![
            date.to_string(),
            participant.id.to_string(),
            participant.username.clone(),
            participant.display_name.clone(),
            requested_at.format(LEDGER_TIME_FORMAT).to_string(),
        ];
        self.store.append_row(&self.table, &row).await?;
        tracing::info!(participant = %participant.id, %date, "absence declared");
        Ok(())
    }

    /// Whether the participant declared absence for the date.
    ///
    /// Fail-open: no matching row, an empty table, and a transport failure
    /// all come back `false`. A wrongly-normal record beats a lost one.
    pub async fn was_declared(&self, participant_id: &ParticipantId, date: NaiveDate) -> bool {
        let rows = match self.store.rows(&self.table).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    participant = %participant_id,
                    %date,
                    error = %err,
                    "absence lookup failed, assuming no declaration"
                );
                return false;
            }
        };

        let date = date.to_string();
        rows.iter().any(|row| {
            row.get(COL_DATE).is_some_and(|d| *d == date)
                && row
                    .get(COL_PARTICIPANT_ID)
                    .is_some_and(|id| id == participant_id.as_str())
        })
    }
}
