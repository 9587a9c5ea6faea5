//! Replay command: drain the spill queue through the ledger.

use anyhow::{Context, Result};

use rc_ledger::{DrainReport, replay};

use crate::Config;

pub async fn run(config: &Config) -> Result<DrainReport> {
    let store = config.ledger()?;
    let queue = config.spill_queue();
    replay::drain(&store, &config.activity_table, &queue)
        .await
        .context("failed to drain spill queue")
}
