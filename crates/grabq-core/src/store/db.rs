//! SQLite-backed state store: connection and migrations. Row mapping lives in `jobs`.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;

/// File name of the queue database inside the state directory.
pub const STATE_FILE: &str = "queue.db";

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the queue state database.
#[derive(Clone)]
pub struct StateStore {
    pub(crate) pool: Pool<Sqlite>,
    location: Option<PathBuf>,
}

impl StateStore {
    /// Open (or create) `queue.db` inside `state_dir` and run migrations.
    pub async fn open_in_dir(state_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::open_at(state_dir.as_ref().join(STATE_FILE)).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;
        let store = StateStore {
            pool,
            location: Some(path.to_path_buf()),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store. Used when the state file cannot be opened so the engine
    /// keeps working without durability, and by tests.
    pub async fn open_memory() -> Result<Self, PersistenceError> {
        // One connection that never expires: every connection to `:memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = StateStore {
            pool,
            location: None,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Path of the backing file, `None` for the in-memory store.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Close the connection pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<(), PersistenceError> {
        // - `list` is the collection name ("queue", "pending", "done").
        // - `position` keeps list order (FIFO for the queue).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY NOT NULL,
                list TEXT NOT NULL,
                position INTEGER NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                progress REAL NOT NULL,
                speed TEXT NOT NULL,
                eta TEXT NOT NULL,
                destination_path TEXT NOT NULL,
                total_bytes INTEGER NOT NULL,
                downloaded_bytes INTEGER NOT NULL,
                quality TEXT,
                format TEXT,
                folder TEXT,
                auto_start INTEGER NOT NULL,
                playlist INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                completed_at INTEGER,
                last_error TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
