//! Ledger store client and reliable delivery machinery.
//!
//! The ledger is an external append-only row store with two tables: one for
//! completed attendance records, one for absence declarations. This crate
//! provides:
//! - the [`LedgerStore`] contract and its HTTP implementation
//! - the absence reconciliation adapter
//! - the reliable sink (retry, backoff, spill-to-disk)
//! - the replay processor that drains the spill queue

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use rc_core::ActivityRecord;

pub mod absence;
pub mod http;
pub mod replay;
pub mod sink;
pub mod spill;

pub use absence::AbsenceLedger;
pub use http::HttpLedger;
pub use replay::DrainReport;
pub use sink::{ReliableSink, RetryPolicy, Submission};
pub use spill::{SpillError, SpillQueue, SpilledRecord};

/// Wall-clock format used for ledger timestamp columns.
const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row installed in the activity table by `setup`.
pub const ACTIVITY_HEADER: [&str; 13] = [
    "Date",
    "Participant ID",
    "Username",
    "Display Name",
    "Entry Time",
    "Exit Time",
    "Duration (min)",
    "Entry Hour",
    "Tier",
    "Symbol",
    "Label",
    "Weight",
    "Prior Absence",
];

/// Header row installed in the absence table by `setup`.
pub const ABSENCE_HEADER: [&str; 5] = [
    "Date",
    "Participant ID",
    "Username",
    "Display Name",
    "Requested At",
];

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The provided access token was invalid.
    #[error("invalid ledger token: {reason}")]
    InvalidToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store rejected a call.
    #[error("ledger error: status {status}: {body}")]
    Status { status: u16, body: String },
    /// Failed to parse a response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// An append-only row store with positional columns.
///
/// Appends are at-least-once: a retried append whose first attempt actually
/// landed may produce a duplicate row. Deduplication is left to the store.
#[expect(
    async_fn_in_trait,
    reason = "futures stay on the single-threaded event loop"
)]
pub trait LedgerStore {
    /// Appends one row to the named table.
    async fn append_row(&self, table: &str, row: &[String]) -> Result<(), LedgerError>;

    /// Reads every row of the named table.
    async fn rows(&self, table: &str) -> Result<Vec<Vec<String>>, LedgerError>;
}

/// Renders an activity record as a positional ledger row.
#[must_use]
pub fn activity_row(record: &ActivityRecord) -> Vec<String> {
    vec![
        record.date.to_string(),
        record.participant.id.to_string(),
        record.participant.username.clone(),
        record.participant.display_name.clone(),
        ledger_time(record.entered_at),
        ledger_time(record.left_at),
        record.duration_minutes.to_string(),
        record.entry_hour.to_string(),
        record.tier.to_string(),
        record.tier.symbol().to_string(),
        record.tier.label().to_string(),
        record.tier.weight().to_string(),
        record.prior_absence.to_string(),
    ]
}

fn ledger_time(at: DateTime<FixedOffset>) -> String {
    at.format(LEDGER_TIME_FORMAT).to_string()
}
