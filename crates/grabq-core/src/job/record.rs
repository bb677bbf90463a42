//! The durable description of one download.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{JobId, JobStatus, ListKind};

/// Full job record: identity, request parameters and current lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub url: String,
    /// Empty until metadata has been resolved.
    pub title: String,
    pub status: JobStatus,
    /// Fraction complete in [0.0, 1.0].
    pub progress: f64,
    /// Display string for the transfer rate, best-effort.
    pub speed: String,
    /// Display string for the remaining time, best-effort.
    pub eta: String,
    pub destination_path: String,
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub quality: Option<String>,
    pub format: Option<String>,
    /// Sub-folder of the download directory.
    pub folder: Option<String>,
    pub auto_start: bool,
    /// Resolution reported a playlist; selects the playlist output template.
    pub playlist: bool,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub last_error: String,
}

impl JobRecord {
    /// New record for `url`. Status follows `auto_start`: queued or pending.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        quality: Option<String>,
        format: Option<String>,
        folder: Option<String>,
        auto_start: bool,
    ) -> Self {
        Self {
            id: JobId::generate(),
            url: url.into(),
            title: title.into(),
            status: if auto_start {
                JobStatus::Queued
            } else {
                JobStatus::Pending
            },
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            destination_path: String::new(),
            total_bytes: 0,
            downloaded_bytes: 0,
            quality,
            format,
            folder,
            auto_start,
            playlist: false,
            created_at: unix_timestamp(),
            completed_at: None,
            last_error: String::new(),
        }
    }

    /// The list a freshly created record belongs to.
    pub fn initial_list(&self) -> ListKind {
        if self.auto_start {
            ListKind::Queued
        } else {
            ListKind::Pending
        }
    }

    /// Clear transfer display fields; used when a download stops.
    pub(crate) fn clear_transfer_labels(&mut self) {
        self.speed.clear();
        self.eta.clear();
    }
}

/// The three job lists, in order. Used for persistence and for `list_all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queued: Vec<JobRecord>,
    pub pending: Vec<JobRecord>,
    pub completed: Vec<JobRecord>,
}

impl QueueSnapshot {
    pub fn list(&self, kind: ListKind) -> &[JobRecord] {
        match kind {
            ListKind::Queued => &self.queued,
            ListKind::Pending => &self.pending,
            ListKind::Completed => &self.completed,
        }
    }

    pub fn list_mut(&mut self, kind: ListKind) -> &mut Vec<JobRecord> {
        match kind {
            ListKind::Queued => &mut self.queued,
            ListKind::Pending => &mut self.pending,
            ListKind::Completed => &mut self.completed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.pending.is_empty() && self.completed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len() + self.pending.len() + self.completed.len()
    }
}

/// Current time as Unix seconds.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_start_decides_initial_status_and_list() {
        let queued = JobRecord::new("https://a/x", "x", None, None, None, true);
        assert_eq!(queued.status, JobStatus::Queued);
        assert_eq!(queued.initial_list(), ListKind::Queued);

        let pending = JobRecord::new("https://a/y", "", None, None, None, false);
        assert_eq!(pending.status, JobStatus::Pending);
        assert_eq!(pending.initial_list(), ListKind::Pending);
        assert!(pending.title.is_empty());
        assert!(pending.last_error.is_empty());
        assert!(pending.completed_at.is_none());
    }

    #[test]
    fn snapshot_list_selector() {
        let mut snap = QueueSnapshot::default();
        assert!(snap.is_empty());
        snap.list_mut(ListKind::Pending)
            .push(JobRecord::new("https://a/y", "", None, None, None, false));
        assert_eq!(snap.list(ListKind::Pending).len(), 1);
        assert!(snap.list(ListKind::Queued).is_empty());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn record_serializes_status_lowercase() {
        let rec = JobRecord::new("https://a/x", "x", Some("720".into()), None, None, true);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["quality"], "720");
        assert!(json["format"].is_null());
    }
}
