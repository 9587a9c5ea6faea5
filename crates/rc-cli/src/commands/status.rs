//! Status command for showing spill queue state.

use std::io::Write;

use anyhow::Result;

use rc_ledger::SpillError;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let queue = config.spill_queue();

    writeln!(writer, "Attendance tracker status")?;
    writeln!(writer, "Spill queue: {}", queue.path().display())?;

    match queue.load() {
        Ok(records) if records.is_empty() => {
            writeln!(writer, "No records awaiting replay.")?;
        }
        Ok(records) => {
            writeln!(writer, "Records awaiting replay: {}", records.len())?;
            for record in &records {
                writeln!(
                    writer,
                    "- {} {} ({} min, failed at {})",
                    record.record.date,
                    record.record.participant.display_name,
                    record.record.duration_minutes,
                    record.failed_at,
                )?;
            }
        }
        Err(SpillError::Corrupt { path, .. }) => {
            writeln!(
                writer,
                "Spill queue at {} is unreadable; it will be quarantined on the next replay.",
                path.display()
            )?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
