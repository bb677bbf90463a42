//! Identifier, status and list selector types shared by the engine and the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Opaque job identifier (UUID v4 rendered as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a job, stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Downloading,
    Completed,
    Error,
    Canceled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Unknown strings map to `Error` so a damaged row is never silently admitted.
    pub fn from_store_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "queued" => JobStatus::Queued,
            "downloading" => JobStatus::Downloading,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            "canceled" => JobStatus::Canceled,
            _ => JobStatus::Error,
        }
    }

    /// True for the states that belong in the completed list.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Canceled
        )
    }
}

/// Which of the three job lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Queued,
    Pending,
    Completed,
}

impl ListKind {
    /// Collection name used in the persisted layout.
    pub fn store_key(self) -> &'static str {
        match self {
            ListKind::Queued => "queue",
            ListKind::Pending => "pending",
            ListKind::Completed => "done",
        }
    }

    pub fn from_store_key(key: &str) -> Option<Self> {
        match key {
            "queue" => Some(ListKind::Queued),
            "pending" => Some(ListKind::Pending),
            "done" => Some(ListKind::Completed),
            _ => None,
        }
    }
}

impl FromStr for ListKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" | "queued" => Ok(ListKind::Queued),
            "pending" => Ok(ListKind::Pending),
            "done" | "completed" => Ok(ListKind::Completed),
            other => Err(EngineError::UnknownList(other.to_string())),
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_key())
    }
}
