//! Presence signals emitted by the event source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{ChannelId, Participant};

/// Direction of a channel transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Enter,
    Leave,
}

/// A single enter/leave signal for one participant.
///
/// The event source emits these for every channel transition; the tracker
/// filters for its one watched channel. `timestamp` is the gateway-observed
/// time of the transition, in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSignal {
    pub kind: SignalKind,
    pub participant: Participant,
    pub channel_id: ChannelId,
    pub timestamp: DateTime<Utc>,
}
