//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use rc_core::{ChannelId, PunctualityPolicy};
use rc_ledger::{HttpLedger, RetryPolicy, SpillQueue};

/// Application configuration.
///
/// `ledger_url`, `ledger_token`, and `channel_id` have no sensible defaults
/// and must be provided; the accessor methods surface their absence as a
/// startup error before any signal is accepted.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the ledger row-store API.
    pub ledger_url: Option<String>,
    /// Access token for the ledger.
    pub ledger_token: Option<String>,
    /// The one watched channel.
    pub channel_id: Option<String>,
    /// Ledger table for attendance records.
    pub activity_table: String,
    /// Ledger table for absence declarations.
    pub absence_table: String,
    /// Session-local timezone as a fixed UTC offset, in hours.
    pub utc_offset_hours: i8,
    /// On-time boundary as a minute-of-day in session-local time.
    pub target_minute: u16,
    /// Absence declarations close at this local hour-of-day.
    pub absence_cutoff_hour: u8,
    /// Ledger append attempts per submission.
    pub retry_max_attempts: u32,
    /// Backoff before the second attempt, in seconds; doubles per attempt.
    pub retry_base_delay_secs: u64,
    /// Path of the spill queue file.
    pub spill_path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("ledger_url", &self.ledger_url)
            .field("ledger_token", &self.ledger_token.as_ref().map(|_| "[REDACTED]"))
            .field("channel_id", &self.channel_id)
            .field("activity_table", &self.activity_table)
            .field("absence_table", &self.absence_table)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("target_minute", &self.target_minute)
            .field("absence_cutoff_hour", &self.absence_cutoff_hour)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_base_delay_secs", &self.retry_base_delay_secs)
            .field("spill_path", &self.spill_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = dirs_state_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            ledger_url: None,
            ledger_token: None,
            channel_id: None,
            activity_table: "activity_log".to_string(),
            absence_table: "absence_log".to_string(),
            utc_offset_hours: 9,
            target_minute: 7 * 60,
            absence_cutoff_hour: 4,
            retry_max_attempts: 3,
            retry_base_delay_secs: 2,
            spill_path: state_dir.join("spill.json"),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ROLLCALL_*)
        figment = figment.merge(Env::prefixed("ROLLCALL_"));

        figment.extract()
    }

    /// Builds the ledger client. Missing URL or token is fatal.
    pub fn ledger(&self) -> Result<HttpLedger> {
        let url = self
            .ledger_url
            .as_deref()
            .context("ledger_url is not configured")?;
        let token = self
            .ledger_token
            .as_deref()
            .context("ledger_token is not configured")?;
        HttpLedger::new(url, token).context("failed to build ledger client")
    }

    /// The watched channel. Missing is fatal.
    pub fn channel(&self) -> Result<ChannelId> {
        let id = self
            .channel_id
            .as_deref()
            .context("channel_id is not configured")?;
        ChannelId::new(id).context("channel_id is invalid")
    }

    /// The session-local fixed UTC offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(i32::from(self.utc_offset_hours) * 3600)
            .with_context(|| format!("utc_offset_hours {} is out of range", self.utc_offset_hours))
    }

    /// The punctuality policy. A target past the end of the day is fatal.
    pub fn policy(&self) -> Result<PunctualityPolicy> {
        anyhow::ensure!(
            self.target_minute < 24 * 60,
            "target_minute {} is not a minute-of-day",
            self.target_minute
        );
        Ok(PunctualityPolicy::new(self.target_minute))
    }

    /// The absence cutoff hour-of-day.
    pub fn cutoff_hour(&self) -> Result<u8> {
        anyhow::ensure!(
            self.absence_cutoff_hour < 24,
            "absence_cutoff_hour {} is not an hour-of-day",
            self.absence_cutoff_hour
        );
        Ok(self.absence_cutoff_hour)
    }

    /// The sink retry budget.
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            base_delay: Duration::from_secs(self.retry_base_delay_secs),
        }
    }

    /// The spill queue at the configured path.
    pub fn spill_queue(&self) -> SpillQueue {
        SpillQueue::new(self.spill_path.clone())
    }
}

/// Returns the platform-specific config directory for rollcall.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rollcall"))
}

/// Returns the platform-specific state directory for rollcall.
///
/// On Linux: `~/.local/state/rollcall`
pub fn dirs_state_path() -> Option<PathBuf> {
    dirs::state_dir().map(|p| p.join("rollcall"))
}
