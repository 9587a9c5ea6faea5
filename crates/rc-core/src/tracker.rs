//! Session correlation: turning enter/leave signals into attendance records.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::identity::{ChannelId, Participant, ParticipantId};
use crate::record::ActivityRecord;
use crate::signal::{PresenceSignal, SignalKind};
use crate::tier::PunctualityPolicy;

/// An in-progress presence interval for one participant.
#[derive(Debug, Clone)]
struct OpenSession {
    participant: Participant,
    entered_at: DateTime<FixedOffset>,
}

/// Correlates presence signals for one watched channel into completed
/// attendance records.
///
/// Owns the set of open sessions exclusively. The caller must feed signals
/// one at a time, in arrival order per participant; the tracker itself is
/// synchronous and never blocks, so processing one signal fully before the
/// next is enough to keep session state race-free.
#[derive(Debug)]
pub struct Tracker {
    channel: ChannelId,
    offset: FixedOffset,
    policy: PunctualityPolicy,
    open: HashMap<ParticipantId, OpenSession>,
}

impl Tracker {
    #[must_use]
    pub fn new(channel: ChannelId, offset: FixedOffset, policy: PunctualityPolicy) -> Self {
        Self {
            channel,
            offset,
            policy,
            open: HashMap::new(),
        }
    }

    /// Number of currently open sessions.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open.len()
    }

    /// Applies one presence signal, returning the completed record when a
    /// session closes.
    ///
    /// Signals for other channels are ignored. The returned record has
    /// `prior_absence` unset (false); the caller reconciles it against the
    /// absence ledger before delivery.
    pub fn apply(&mut self, signal: &PresenceSignal) -> Option<ActivityRecord> {
        if signal.channel_id != self.channel {
            return None;
        }
        match signal.kind {
            SignalKind::Enter => {
                self.on_enter(&signal.participant, signal.timestamp);
                None
            }
            SignalKind::Leave => self.on_leave(&signal.participant.id, signal.timestamp),
        }
    }

    fn on_enter(&mut self, participant: &Participant, now: DateTime<Utc>) {
        if let Some(existing) = self.open.get(&participant.id) {
            // Re-entry guard: the original entry time wins.
            tracing::debug!(
                participant = %participant.id,
                entered_at = %existing.entered_at,
                "enter signal for already-open session, keeping original entry"
            );
            return;
        }
        let entered_at = now.with_timezone(&self.offset);
        tracing::info!(
            participant = %participant.id,
            display_name = %participant.display_name,
            %entered_at,
            "session opened"
        );
        self.open.insert(
            participant.id.clone(),
            OpenSession {
                participant: participant.clone(),
                entered_at,
            },
        );
    }

    fn on_leave(
        &mut self,
        participant_id: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Option<ActivityRecord> {
        let Some(session) = self.open.remove(participant_id) else {
            // Benign: the process may have started after the enter signal.
            tracing::debug!(
                participant = %participant_id,
                "leave signal with no open session, ignoring"
            );
            return None;
        };

        let left_at = now.with_timezone(&self.offset);
        let duration_minutes = (left_at - session.entered_at).num_minutes().max(0);
        let minute_of_day = minute_of_day(session.entered_at);
        let record = ActivityRecord {
            date: session.entered_at.date_naive(),
            entry_hour: session.entered_at.hour(),
            tier: self.policy.classify(minute_of_day),
            participant: session.participant,
            entered_at: session.entered_at,
            left_at,
            duration_minutes,
            prior_absence: false,
        };
        tracing::info!(
            participant = %record.participant.id,
            duration_minutes = record.duration_minutes,
            tier = %record.tier,
            "session closed"
        );
        Some(record)
    }
}

/// Minute-of-day (hour * 60 + minute) of a session-local timestamp.
fn minute_of_day(at: DateTime<FixedOffset>) -> u16 {
    // Hour and minute both fit comfortably in u16.
    u16::try_from(at.hour() * 60 + at.minute()).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Tier;
    use chrono::TimeZone;

    const JST_SECS: i32 = 9 * 3600;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(JST_SECS).unwrap()
    }

    fn tracker() -> Tracker {
        Tracker::new(
            ChannelId::new("voice-main").unwrap(),
            jst(),
            PunctualityPolicy::new(7 * 60),
        )
    }

    fn participant(id: &str) -> Participant {
        Participant {
            id: ParticipantId::new(id).unwrap(),
            username: format!("user_{id}"),
            display_name: format!("User {id}"),
        }
    }

    /// Local wall-clock time in JST, expressed as the UTC instant the
    /// gateway would deliver.
    fn at_local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        jst()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn signal(
        kind: SignalKind,
        who: &Participant,
        channel: &str,
        timestamp: DateTime<Utc>,
    ) -> PresenceSignal {
        PresenceSignal {
            kind,
            participant: who.clone(),
            channel_id: ChannelId::new(channel).unwrap(),
            timestamp,
        }
    }

    #[test]
    fn enter_then_leave_produces_one_record() {
        let mut tracker = tracker();
        let p = participant("1");

        let open = tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 7, 2),
        ));
        assert!(open.is_none());
        assert_eq!(tracker.open_sessions(), 1);

        let record = tracker
            .apply(&signal(
                SignalKind::Leave,
                &p,
                "voice-main",
                at_local(2026, 1, 6, 7, 49),
            ))
            .expect("leave should close the session");
        assert_eq!(tracker.open_sessions(), 0);
        assert_eq!(record.duration_minutes, 47);
        assert_eq!(record.entry_hour, 7);
        assert_eq!(record.tier, Tier::OnTime);
        assert!(!record.prior_absence);
    }

    #[test]
    fn leave_without_open_session_is_a_no_op() {
        let mut tracker = tracker();
        let p = participant("1");
        let record = tracker.apply(&signal(
            SignalKind::Leave,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 8, 0),
        ));
        assert!(record.is_none());
        assert_eq!(tracker.open_sessions(), 0);
    }

    #[test]
    fn duplicate_enter_keeps_original_entry_time() {
        let mut tracker = tracker();
        let p = participant("1");

        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 7, 0),
        ));
        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 7, 30),
        ));
        assert_eq!(tracker.open_sessions(), 1);

        let record = tracker
            .apply(&signal(
                SignalKind::Leave,
                &p,
                "voice-main",
                at_local(2026, 1, 6, 8, 0),
            ))
            .unwrap();
        assert_eq!(record.duration_minutes, 60);
        assert_eq!(record.tier, Tier::OnTime);
    }

    #[test]
    fn other_channels_are_ignored() {
        let mut tracker = tracker();
        let p = participant("1");

        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-other",
            at_local(2026, 1, 6, 7, 0),
        ));
        assert_eq!(tracker.open_sessions(), 0);

        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 7, 5),
        ));
        let record = tracker.apply(&signal(
            SignalKind::Leave,
            &p,
            "voice-other",
            at_local(2026, 1, 6, 7, 10),
        ));
        assert!(record.is_none(), "leave for another channel must not close");
        assert_eq!(tracker.open_sessions(), 1);
    }

    #[test]
    fn participants_have_independent_sessions() {
        let mut tracker = tracker();
        let a = participant("a");
        let b = participant("b");

        tracker.apply(&signal(
            SignalKind::Enter,
            &a,
            "voice-main",
            at_local(2026, 1, 6, 7, 0),
        ));
        tracker.apply(&signal(
            SignalKind::Enter,
            &b,
            "voice-main",
            at_local(2026, 1, 6, 7, 20),
        ));
        assert_eq!(tracker.open_sessions(), 2);

        let record_b = tracker
            .apply(&signal(
                SignalKind::Leave,
                &b,
                "voice-main",
                at_local(2026, 1, 6, 7, 45),
            ))
            .unwrap();
        assert_eq!(record_b.participant.id, b.id);
        assert_eq!(record_b.tier, Tier::Late);
        assert_eq!(tracker.open_sessions(), 1);
    }

    #[test]
    fn fifo_matching_over_repeated_visits() {
        let mut tracker = tracker();
        let p = participant("1");
        let mut records = Vec::new();

        // leave, enter, leave, enter, leave: the leading leave matches
        // nothing, the rest pair up FIFO into two records.
        let sequence = [
            (SignalKind::Leave, 6, 50),
            (SignalKind::Enter, 7, 0),
            (SignalKind::Leave, 7, 30),
            (SignalKind::Enter, 7, 40),
            (SignalKind::Leave, 8, 5),
        ];
        for (kind, h, m) in sequence {
            if let Some(record) =
                tracker.apply(&signal(kind, &p, "voice-main", at_local(2026, 1, 6, h, m)))
            {
                records.push(record);
            }
        }

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration_minutes, 30);
        assert_eq!(records[0].tier, Tier::OnTime);
        assert_eq!(records[1].duration_minutes, 25);
        assert_eq!(records[1].tier, Tier::Late);
    }

    #[test]
    fn midnight_spanning_session_keeps_entry_date() {
        let mut tracker = tracker();
        let p = participant("1");

        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 23, 50),
        ));
        let record = tracker
            .apply(&signal(
                SignalKind::Leave,
                &p,
                "voice-main",
                at_local(2026, 1, 7, 0, 20),
            ))
            .unwrap();

        assert_eq!(record.date, chrono::NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
        assert_eq!(record.duration_minutes, 30);
    }

    #[test]
    fn duration_floors_partial_minutes_and_never_goes_negative() {
        let mut tracker = tracker();
        let p = participant("1");

        let enter = jst().with_ymd_and_hms(2026, 1, 6, 7, 0, 30).unwrap();
        let leave = jst().with_ymd_and_hms(2026, 1, 6, 7, 2, 15).unwrap();
        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            enter.with_timezone(&Utc),
        ));
        let record = tracker
            .apply(&signal(
                SignalKind::Leave,
                &p,
                "voice-main",
                leave.with_timezone(&Utc),
            ))
            .unwrap();
        assert_eq!(record.duration_minutes, 1);

        // A skewed clock may deliver the leave before the entry time; the
        // duration clamps to zero rather than going negative.
        tracker.apply(&signal(
            SignalKind::Enter,
            &p,
            "voice-main",
            at_local(2026, 1, 6, 9, 0),
        ));
        let record = tracker
            .apply(&signal(
                SignalKind::Leave,
                &p,
                "voice-main",
                at_local(2026, 1, 6, 8, 55),
            ))
            .unwrap();
        assert_eq!(record.duration_minutes, 0);
    }

    #[test]
    fn date_and_hour_derive_from_local_offset() {
        // 22:30 UTC on Jan 5 is 07:30 JST on Jan 6.
        let mut tracker = tracker();
        let p = participant("1");

        let enter = Utc.with_ymd_and_hms(2026, 1, 5, 22, 30, 0).unwrap();
        let leave = Utc.with_ymd_and_hms(2026, 1, 5, 23, 30, 0).unwrap();
        tracker.apply(&signal(SignalKind::Enter, &p, "voice-main", enter));
        let record = tracker
            .apply(&signal(SignalKind::Leave, &p, "voice-main", leave))
            .unwrap();

        assert_eq!(record.date, chrono::NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
        assert_eq!(record.entry_hour, 7);
        assert_eq!(record.tier, Tier::Late);
    }
}
