//! Queue engine: the public handle over the actor that owns every job.
//!
//! `QueueEngine` is cheap to clone. Mutating calls return once the resulting
//! state has been written to the store.

mod actor;
mod admission;
mod command;

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::GrabqConfig;
use crate::error::{EngineError, Result};
use crate::extractor::{Extractor, MediaInfo};
use crate::job::{JobId, JobRecord, ListKind, QueueSnapshot};
use crate::notifier::{Notifier, QueueEvent, QueueObserver};
use crate::store::{StateStore, StoreWriter};
use crate::validate::{normalize_folder, validate_source_url};

use actor::Actor;
use command::Command;

const COMMAND_CAPACITY: usize = 64;

/// Parameters of a new job.
#[derive(Debug, Clone, Default)]
pub struct AddRequest {
    pub url: String,
    pub quality: Option<String>,
    pub format: Option<String>,
    /// Sub-folder of the download directory.
    pub folder: Option<String>,
    /// Queue immediately (resolving metadata first) instead of parking as pending.
    pub auto_start: bool,
}

impl AddRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_start: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct QueueEngine {
    commands: mpsc::Sender<Command>,
    notifier: Notifier,
    extractor: Arc<dyn Extractor>,
}

impl QueueEngine {
    /// Load persisted state and start the engine.
    ///
    /// A state file that cannot be opened is logged and replaced by an
    /// in-memory store; jobs interrupted mid-download are queued again.
    pub async fn open(config: GrabqConfig, extractor: Arc<dyn Extractor>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

        let store = open_store(&config).await?;
        let mut lists = store.load().await;
        let reset = actor::reset_interrupted(&mut lists);
        tracing::info!(
            queued = lists.queued.len(),
            pending = lists.pending.len(),
            completed = lists.completed.len(),
            reset,
            store = ?store.location(),
            "queue state loaded"
        );

        let writer = StoreWriter::spawn(store);
        let notifier = Notifier::new();
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (actor, channels) = Actor::new(
            Arc::new(config),
            Arc::clone(&extractor),
            lists,
            writer,
            notifier.clone(),
            rx,
        );
        tokio::spawn(actor.run(channels));

        Ok(Self {
            commands: tx,
            notifier,
            extractor,
        })
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Add a job. Auto-start jobs are resolved first; a resolution failure
    /// creates nothing and is returned.
    pub async fn add(&self, request: AddRequest) -> Result<JobRecord> {
        let url = validate_source_url(&request.url)?;
        let folder = normalize_folder(request.folder.as_deref())?;
        let quality = request.quality.filter(|s| !s.trim().is_empty());
        let format = request.format.filter(|s| !s.trim().is_empty());

        let mut record = if request.auto_start {
            let info = self.extractor.resolve(&url).await?;
            let mut record = JobRecord::new(url, info.title, quality, format, folder, true);
            record.playlist = info.playlist;
            record
        } else {
            JobRecord::new(url, "", quality, format, folder, false)
        };
        if record.title.is_empty() && request.auto_start {
            record.title = record.url.clone();
        }

        let (record, ack) = self
            .request(|reply| Command::Add { record, reply })
            .await?;
        ack.wait().await;
        Ok(record)
    }

    pub async fn list(&self, kind: ListKind) -> Result<Vec<JobRecord>> {
        self.request(|reply| Command::List { kind, reply }).await
    }

    pub async fn list_queued(&self) -> Result<Vec<JobRecord>> {
        self.list(ListKind::Queued).await
    }

    pub async fn list_pending(&self) -> Result<Vec<JobRecord>> {
        self.list(ListKind::Pending).await
    }

    pub async fn list_completed(&self) -> Result<Vec<JobRecord>> {
        self.list(ListKind::Completed).await
    }

    /// Finished jobs, whatever their outcome.
    pub async fn history(&self) -> Result<Vec<JobRecord>> {
        self.list_completed().await
    }

    /// All three lists at one point in time.
    pub async fn list_all(&self) -> Result<QueueSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Remove jobs from `from`, stopping running downloads first.
    /// Ids not in that list are ignored.
    pub async fn delete(&self, ids: Vec<JobId>, from: ListKind) -> Result<()> {
        let ack = self
            .request(|reply| Command::Delete { ids, from, reply })
            .await?;
        ack.wait().await;
        Ok(())
    }

    /// Move pending jobs to the queue, in pending-list order.
    pub async fn start(&self, ids: Vec<JobId>) -> Result<()> {
        let ack = self.request(|reply| Command::Start { ids, reply }).await?;
        ack.wait().await;
        Ok(())
    }

    pub async fn clear_completed(&self) -> Result<()> {
        let ack = self
            .request(|reply| Command::ClearCompleted { reply })
            .await?;
        ack.wait().await;
        Ok(())
    }

    /// Look up metadata without creating a job.
    pub async fn resolve_info(&self, url: &str) -> Result<MediaInfo> {
        let url = validate_source_url(url)?;
        Ok(self.extractor.resolve(&url).await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.notifier.subscribe()
    }

    pub fn register(&self, observer: Arc<dyn QueueObserver>) {
        self.notifier.register(observer);
    }

    /// Stop every download, requeue interrupted jobs and flush the store.
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Command::Close { reply }).await
    }
}

async fn open_store(config: &GrabqConfig) -> Result<StateStore> {
    match config.state_dir() {
        Ok(dir) => match StateStore::open_in_dir(&dir).await {
            Ok(store) => return Ok(store),
            Err(e) => tracing::error!(
                "cannot open state store in {}, continuing in memory: {}",
                dir.display(),
                e
            ),
        },
        Err(e) => tracing::error!("no state directory, continuing in memory: {:#}", e),
    }
    Ok(StateStore::open_memory().await?)
}
