//! The finalized attendance record for one completed session.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::identity::Participant;
use crate::tier::Tier;

/// The immutable result of one completed session.
///
/// Timestamps carry the session-local offset so the record renders the same
/// wall-clock times it was classified against. `date` is the calendar day of
/// entry, never of exit: a session that crosses midnight stays on the day it
/// started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub participant: Participant,
    pub date: NaiveDate,
    pub entered_at: DateTime<FixedOffset>,
    pub left_at: DateTime<FixedOffset>,
    /// Whole minutes from entry to exit, floored. Never negative.
    pub duration_minutes: i64,
    /// Hour-of-day of entry in session-local time.
    pub entry_hour: u32,
    pub tier: Tier,
    /// The participant had declared absence for `date` before joining.
    pub prior_absence: bool,
}
