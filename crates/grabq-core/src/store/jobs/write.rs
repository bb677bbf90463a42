//! Replace the persisted job lists.

use crate::error::PersistenceError;
use crate::job::{JobRecord, ListKind, QueueSnapshot};

use super::super::db::StateStore;

impl StateStore {
    /// Replace the stored state with `snapshot` in a single transaction.
    ///
    /// A failure leaves the previous state intact.
    pub async fn save(&self, snapshot: &QueueSnapshot) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM jobs").execute(&mut *tx).await?;

        for kind in [ListKind::Queued, ListKind::Pending, ListKind::Completed] {
            for (position, record) in snapshot.list(kind).iter().enumerate() {
                insert_record(&mut tx, kind, position as i64, record).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    kind: ListKind,
    position: i64,
    record: &JobRecord,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, list, position, url, title, status, progress, speed, eta,
            destination_path, total_bytes, downloaded_bytes,
            quality, format, folder, auto_start, playlist,
            created_at, completed_at, last_error
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                  ?10, ?11, ?12,
                  ?13, ?14, ?15, ?16, ?17,
                  ?18, ?19, ?20)
        "#,
    )
    .bind(record.id.as_str())
    .bind(kind.store_key())
    .bind(position)
    .bind(&record.url)
    .bind(&record.title)
    .bind(record.status.as_str())
    .bind(record.progress)
    .bind(&record.speed)
    .bind(&record.eta)
    .bind(&record.destination_path)
    .bind(record.total_bytes as i64)
    .bind(record.downloaded_bytes as i64)
    .bind(&record.quality)
    .bind(&record.format)
    .bind(&record.folder)
    .bind(record.auto_start)
    .bind(record.playlist)
    .bind(record.created_at)
    .bind(record.completed_at)
    .bind(&record.last_error)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
