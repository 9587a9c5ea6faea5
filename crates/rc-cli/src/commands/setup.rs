//! Setup command: install header rows in the ledger tables.

use anyhow::{Context, Result};

use rc_ledger::{ABSENCE_HEADER, ACTIVITY_HEADER, LedgerStore};

use crate::Config;

pub async fn run(config: &Config) -> Result<()> {
    let store = config.ledger()?;

    let header: Vec<String> = ACTIVITY_HEADER.iter().map(ToString::to_string).collect();
    store
        .append_row(&config.activity_table, &header)
        .await
        .with_context(|| format!("failed to initialize {}", config.activity_table))?;

    let header: Vec<String> = ABSENCE_HEADER.iter().map(ToString::to_string).collect();
    store
        .append_row(&config.absence_table, &header)
        .await
        .with_context(|| format!("failed to initialize {}", config.absence_table))?;

    tracing::info!("ledger tables initialized");
    Ok(())
}
