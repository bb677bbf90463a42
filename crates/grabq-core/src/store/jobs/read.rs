//! Load the persisted job lists.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::PersistenceError;
use crate::job::{JobId, JobRecord, JobStatus, ListKind, QueueSnapshot};

use super::super::db::StateStore;

impl StateStore {
    /// Load all three lists. On any failure, logs and returns empty lists so
    /// startup never aborts because of a damaged store.
    pub async fn load(&self) -> QueueSnapshot {
        match self.try_load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("failed to load queue state, starting empty: {}", e);
                QueueSnapshot::default()
            }
        }
    }

    /// Load all three lists in persisted order.
    pub async fn try_load(&self) -> Result<QueueSnapshot, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, list, url, title, status, progress, speed, eta,
                destination_path, total_bytes, downloaded_bytes,
                quality, format, folder, auto_start, playlist,
                created_at, completed_at, last_error
            FROM jobs
            ORDER BY list ASC, position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = QueueSnapshot::default();
        for row in rows {
            let list: String = row.try_get("list")?;
            let Some(kind) = ListKind::from_store_key(&list) else {
                tracing::warn!(list = %list, "skipping job row in unknown list");
                continue;
            };
            let mut record = record_from_row(&row)?;
            if kind == ListKind::Completed && !record.status.is_terminal() {
                tracing::warn!(job_id = %record.id, status = record.status.as_str(), "unfinished job in completed list; marking as error");
                record.status = JobStatus::Error;
            }
            snapshot.list_mut(kind).push(record);
        }
        Ok(snapshot)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<JobRecord, PersistenceError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let total_bytes: i64 = row.try_get("total_bytes")?;
    let downloaded_bytes: i64 = row.try_get("downloaded_bytes")?;
    Ok(JobRecord {
        id: JobId::from(id),
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        status: JobStatus::from_store_str(&status),
        progress: row.try_get("progress")?,
        speed: row.try_get("speed")?,
        eta: row.try_get("eta")?,
        destination_path: row.try_get("destination_path")?,
        total_bytes: total_bytes.max(0) as u64,
        downloaded_bytes: downloaded_bytes.max(0) as u64,
        quality: row.try_get("quality")?,
        format: row.try_get("format")?,
        folder: row.try_get("folder")?,
        auto_start: row.try_get("auto_start")?,
        playlist: row.try_get("playlist")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
        last_error: row.try_get("last_error")?,
    })
}
