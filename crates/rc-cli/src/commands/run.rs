//! Run command: the single-threaded correlation loop.
//!
//! Consumes JSONL presence signals from stdin, one fully-processed signal
//! at a time. All awaited work for a signal (absence lookup, backoff
//! sleeps, ledger appends) finishes before the next signal is read, so the
//! open-session state never sees interleaved mutation.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use rc_core::{PresenceSignal, Tracker};
use rc_ledger::{AbsenceLedger, LedgerStore, ReliableSink, Submission};

use crate::Config;

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Sessions closed into records.
    pub recorded: usize,
    /// Records the ledger acknowledged.
    pub acknowledged: usize,
    /// Records spilled to disk for replay.
    pub spilled: usize,
    /// Sessions still open when the stream ended.
    pub left_open: usize,
}

pub async fn run(config: &Config) -> Result<RunReport> {
    let store = config.ledger()?;
    let mut tracker = Tracker::new(config.channel()?, config.offset()?, config.policy()?);
    let absence = AbsenceLedger::new(store.clone(), config.absence_table.clone());
    let sink = ReliableSink::new(
        store,
        config.activity_table.clone(),
        config.spill_queue(),
        config.retry(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut report = RunReport::default();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read signal stream")? else {
                    tracing::info!("signal stream ended");
                    break;
                };
                let Some(signal) = parse_signal(&line) else {
                    continue;
                };
                process_signal(&mut tracker, &absence, &sink, &signal, &mut report).await?;
            }
            () = &mut shutdown => {
                tracing::info!("shutdown requested, no longer accepting signals");
                break;
            }
        }
    }

    report.left_open = tracker.open_sessions();
    if report.left_open > 0 {
        tracing::warn!(
            open_sessions = report.left_open,
            "open sessions discarded at shutdown"
        );
    }
    Ok(report)
}

/// Applies one signal and, when a session closes, reconciles the record
/// against the absence ledger and delivers it through the sink.
async fn process_signal<S: LedgerStore>(
    tracker: &mut Tracker,
    absence: &AbsenceLedger<S>,
    sink: &ReliableSink<S>,
    signal: &PresenceSignal,
    report: &mut RunReport,
) -> Result<()> {
    let Some(mut record) = tracker.apply(signal) else {
        return Ok(());
    };

    record.prior_absence = absence
        .was_declared(&record.participant.id, record.date)
        .await;
    if record.prior_absence {
        tracing::info!(
            participant = %record.participant.id,
            date = %record.date,
            "attended despite declared absence"
        );
    }

    report.recorded += 1;
    match sink.submit(record).await.context("spill queue write failed")? {
        Submission::Acknowledged => report.acknowledged += 1,
        Submission::Spilled => report.spilled += 1,
    }
    Ok(())
}

/// Parses one stream line; blank lines and malformed JSON are skipped.
fn parse_signal(line: &str) -> Option<PresenceSignal> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(signal) => Some(signal),
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed signal");
            None
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to register SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    use rc_core::{ChannelId, Participant, ParticipantId, PunctualityPolicy, SignalKind};
    use rc_ledger::{LedgerError, RetryPolicy, SpillQueue};

    /// In-memory ledger shared by the absence adapter and the sink, with
    /// one row set per table.
    #[derive(Clone, Default)]
    struct SharedStore {
        tables: Rc<RefCell<HashMap<String, Vec<Vec<String>>>>>,
    }

    impl SharedStore {
        fn table(&self, name: &str) -> Vec<Vec<String>> {
            self.tables.borrow().get(name).cloned().unwrap_or_default()
        }
    }

    impl LedgerStore for SharedStore {
        async fn append_row(&self, table: &str, row: &[String]) -> Result<(), LedgerError> {
            self.tables
                .borrow_mut()
                .entry(table.to_string())
                .or_default()
                .push(row.to_vec());
            Ok(())
        }

        async fn rows(&self, table: &str) -> Result<Vec<Vec<String>>, LedgerError> {
            Ok(self.table(table))
        }
    }

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn participant(id: &str) -> Participant {
        Participant {
            id: ParticipantId::new(id).unwrap(),
            username: format!("user_{id}"),
            display_name: format!("User {id}"),
        }
    }

    fn at_local(h: u32, mi: u32) -> DateTime<Utc> {
        jst()
            .with_ymd_and_hms(2026, 1, 6, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn signal(kind: SignalKind, who: &Participant, timestamp: DateTime<Utc>) -> PresenceSignal {
        PresenceSignal {
            kind,
            participant: who.clone(),
            channel_id: ChannelId::new("voice-main").unwrap(),
            timestamp,
        }
    }

    fn pipeline(
        store: &SharedStore,
        temp: &tempfile::TempDir,
    ) -> (Tracker, AbsenceLedger<SharedStore>, ReliableSink<SharedStore>) {
        let tracker = Tracker::new(
            ChannelId::new("voice-main").unwrap(),
            jst(),
            PunctualityPolicy::new(7 * 60),
        );
        let absence = AbsenceLedger::new(store.clone(), "absence_log");
        let sink = ReliableSink::new(
            store.clone(),
            "activity_log",
            SpillQueue::new(temp.path().join("spill.json")),
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        );
        (tracker, absence, sink)
    }

    #[tokio::test]
    async fn declared_absence_flag_reaches_the_appended_row() {
        let temp = tempfile::tempdir().unwrap();
        let store = SharedStore::default();
        let (mut tracker, absence, sink) = pipeline(&store, &temp);
        let p = participant("1");

        // Declared before the cutoff, then the participant shows up anyway.
        absence
            .declare(
                &p,
                chrono::NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
                jst().with_ymd_and_hms(2026, 1, 6, 3, 30, 0).unwrap(),
            )
            .await
            .unwrap();

        let mut report = RunReport::default();
        process_signal(
            &mut tracker,
            &absence,
            &sink,
            &signal(SignalKind::Enter, &p, at_local(7, 2)),
            &mut report,
        )
        .await
        .unwrap();
        process_signal(
            &mut tracker,
            &absence,
            &sink,
            &signal(SignalKind::Leave, &p, at_local(7, 49)),
            &mut report,
        )
        .await
        .unwrap();

        assert_eq!(report.recorded, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.spilled, 0);

        // A normal tiered row, flagged as attended-despite-absence.
        let rows = store.table("activity_log");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][8], "on_time");
        assert_eq!(rows[0][12], "true");
    }

    #[tokio::test]
    async fn undeclared_participant_row_is_unflagged() {
        let temp = tempfile::tempdir().unwrap();
        let store = SharedStore::default();
        let (mut tracker, absence, sink) = pipeline(&store, &temp);
        let p = participant("1");

        let mut report = RunReport::default();
        for sig in [
            signal(SignalKind::Enter, &p, at_local(7, 20)),
            signal(SignalKind::Leave, &p, at_local(8, 0)),
        ] {
            process_signal(&mut tracker, &absence, &sink, &sig, &mut report)
                .await
                .unwrap();
        }

        let rows = store.table("activity_log");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][8], "late");
        assert_eq!(rows[0][12], "false");
    }

    #[tokio::test]
    async fn signals_that_close_nothing_submit_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let store = SharedStore::default();
        let (mut tracker, absence, sink) = pipeline(&store, &temp);
        let p = participant("1");

        let mut report = RunReport::default();
        // Unmatched leave, then a bare enter: no record either way.
        for sig in [
            signal(SignalKind::Leave, &p, at_local(6, 50)),
            signal(SignalKind::Enter, &p, at_local(7, 0)),
        ] {
            process_signal(&mut tracker, &absence, &sink, &sig, &mut report)
                .await
                .unwrap();
        }

        assert_eq!(report, RunReport::default());
        assert!(store.table("activity_log").is_empty());
    }

    #[test]
    fn parse_signal_accepts_wire_format() {
        let line = r#"{"kind":"leave","participant":{"id":"1","username":"u","display_name":"d"},"channel_id":"voice-main","timestamp":"2026-01-05T22:49:00Z"}"#;
        let signal = parse_signal(line).unwrap();
        assert_eq!(signal.kind, SignalKind::Leave);
    }

    #[test]
    fn parse_signal_skips_blank_and_malformed_lines() {
        assert!(parse_signal("").is_none());
        assert!(parse_signal("   ").is_none());
        assert!(parse_signal("{\"kind\":").is_none());
        assert!(parse_signal("not json at all").is_none());
    }
}
