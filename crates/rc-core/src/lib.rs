//! Core domain logic for the attendance tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Identity: validated participant and channel identifiers
//! - Classification: punctuality tiers for session entry times
//! - Correlation: turning enter/leave signals into attendance records

pub mod identity;
pub mod record;
pub mod signal;
pub mod tier;
pub mod tracker;

pub use identity::{ChannelId, IdentityError, Participant, ParticipantId};
pub use record::ActivityRecord;
pub use signal::{PresenceSignal, SignalKind};
pub use tier::{PunctualityPolicy, Tier};
pub use tracker::Tracker;
