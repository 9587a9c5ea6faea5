//! The on-disk spill queue for undeliverable attendance records.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rc_core::ActivityRecord;

/// Spill queue errors.
#[derive(Debug, Error)]
pub enum SpillError {
    #[error("failed to access spill queue at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spill queue at {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An attendance record the sink could not deliver, plus when delivery
/// was given up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpilledRecord {
    #[serde(flatten)]
    pub record: ActivityRecord,
    pub failed_at: DateTime<Utc>,
}

/// Ordered, append-only queue of spilled records, stored as one JSON array.
///
/// The file is always read and rewritten wholesale; rewrites go through a
/// temp file in the same directory and a rename, so a crash mid-write
/// leaves the previous queue intact.
#[derive(Debug, Clone)]
pub struct SpillQueue {
    path: PathBuf,
}

impl SpillQueue {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole queue. A missing file is an empty queue.
    pub fn load(&self) -> Result<Vec<SpilledRecord>, SpillError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| SpillError::Corrupt {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(SpillError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replaces the queue contents. An empty set removes the file.
    pub fn replace(&self, records: &[SpilledRecord]) -> Result<(), SpillError> {
        if records.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(SpillError::Io {
                    path: self.path.clone(),
                    source,
                }),
            };
        }

        let json = serde_json::to_string_pretty(records).map_err(|source| SpillError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SpillError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|source| SpillError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| SpillError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Appends one record, preserving everything already queued.
    pub fn push(&self, record: SpilledRecord) -> Result<(), SpillError> {
        let mut records = self.load()?;
        records.push(record);
        self.replace(&records)
    }

    /// Moves an unreadable queue file aside so the next drain starts clean.
    ///
    /// Returns the quarantine path.
    pub fn quarantine(&self) -> Result<PathBuf, SpillError> {
        let quarantined = self
            .path
            .with_extension(format!("corrupt-{}", Utc::now().timestamp()));
        fs::rename(&self.path, &quarantined).map_err(|source| SpillError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(quarantined)
    }
}
