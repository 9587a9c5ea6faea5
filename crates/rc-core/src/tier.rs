//! Punctuality tiers and the time-of-day classification policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Punctuality tier for a session entry, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    OnTime,
    Late,
    VeryLate,
    Critical,
}

impl Tier {
    /// String representation for ledger storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::Late => "late",
            Self::VeryLate => "very_late",
            Self::Critical => "critical",
        }
    }

    /// Human-readable label, as shown in the ledger's label column.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OnTime => "On time",
            Self::Late => "Late",
            Self::VeryLate => "Very late",
            Self::Critical => "Critical",
        }
    }

    /// One-character status symbol, as shown in the ledger's symbol column.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::OnTime => "◎",
            Self::Late => "○",
            Self::VeryLate => "△",
            Self::Critical => "×",
        }
    }

    /// Reward weight. Non-increasing from best to worst tier.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        match self {
            Self::OnTime => 10,
            Self::Late => 5,
            Self::VeryLate => 2,
            Self::Critical => 0,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(Self::OnTime),
            "late" => Ok(Self::Late),
            "very_late" => Ok(Self::VeryLate),
            "critical" => Ok(Self::Critical),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

impl Serialize for Tier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown tier strings.
#[derive(Debug, Clone, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(String);

/// The time-of-day punctuality policy.
///
/// `target_minute` is the on-time boundary as a minute-of-day
/// (hour * 60 + minute) in session-local time, e.g. 420 for 07:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunctualityPolicy {
    pub target_minute: u16,
}

impl PunctualityPolicy {
    #[must_use]
    pub const fn new(target_minute: u16) -> Self {
        Self { target_minute }
    }

    /// Classifies a session-local minute-of-day into a tier.
    ///
    /// Total over minute-of-day; ties resolve to the earlier tier. The
    /// grace bands are anchored at `target_minute`:
    /// up to +14 minutes is on time, under +60 late, under +120 very
    /// late, and everything after that critical.
    #[must_use]
    pub const fn classify(&self, minute_of_day: u16) -> Tier {
        let target = self.target_minute;
        if minute_of_day <= target.saturating_add(14) {
            Tier::OnTime
        } else if minute_of_day < target.saturating_add(60) {
            Tier::Late
        } else if minute_of_day < target.saturating_add(120) {
            Tier::VeryLate
        } else {
            Tier::Critical
        }
    }
}
