//! Absence command: declare absence for the current local date.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Timelike, Utc};

use rc_core::{Participant, ParticipantId};
use rc_ledger::AbsenceLedger;

use crate::Config;

/// How a declaration attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Declaration recorded for the given date.
    Accepted { date: chrono::NaiveDate },
    /// Invoked at or after the cutoff hour; nothing recorded.
    Rejected { message: String },
}

pub async fn run(config: &Config, id: &str, username: &str, display_name: &str) -> Result<Outcome> {
    let cutoff_hour = config.cutoff_hour()?;
    let now_local = Utc::now().with_timezone(&config.offset()?);

    if !is_before_cutoff(now_local, cutoff_hour) {
        return Ok(Outcome::Rejected {
            message: rejection_message(cutoff_hour),
        });
    }

    let participant = Participant {
        id: ParticipantId::new(id).context("participant ID is invalid")?,
        username: username.to_string(),
        display_name: display_name.to_string(),
    };

    let ledger = AbsenceLedger::new(config.ledger()?, config.absence_table.clone());
    let date = now_local.date_naive();
    ledger
        .declare(&participant, date, now_local)
        .await
        .context("failed to record absence declaration")?;

    Ok(Outcome::Accepted { date })
}

/// The cutoff check is advisory: it runs against this process's clock, not
/// the ledger's.
fn is_before_cutoff(now_local: DateTime<FixedOffset>, cutoff_hour: u8) -> bool {
    now_local.hour() < u32::from(cutoff_hour)
}

/// The fixed user-facing rejection message.
fn rejection_message(cutoff_hour: u8) -> String {
    format!("Absence declarations for today closed at {cutoff_hour:02}:00; nothing was recorded.")
}
