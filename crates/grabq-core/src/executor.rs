//! One running download: an isolated tokio task around a single `fetch`.
//!
//! The executor reports progress and its terminal result to the engine over an
//! mpsc channel. A panic inside the fetch is reported as `WorkerCrashed`, never
//! propagated to the engine.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::GrabqConfig;
use crate::error::{FetchError, SchedulingError};
use crate::extractor::{formats, Extractor, FetchOutcome, FetchProgress, FetchRequest};
use crate::job::{JobId, JobRecord};

/// Extra time after the backend's own grace period before the task is aborted.
const ABORT_MARGIN: Duration = Duration::from_secs(2);

/// Message from an executor to the engine.
#[derive(Debug)]
pub(crate) enum ExecutorEvent {
    Progress {
        id: JobId,
        progress: FetchProgress,
    },
    Finished {
        id: JobId,
        result: Result<FetchOutcome, FetchError>,
    },
}

/// Resolve and create the directory a job downloads into.
pub(crate) async fn prepare_output_dir(
    download_dir: &Path,
    folder: Option<&str>,
    create_custom_dirs: bool,
) -> Result<PathBuf, SchedulingError> {
    let dir = match folder {
        Some(f) if !f.is_empty() => download_dir.join(f),
        _ => download_dir.to_path_buf(),
    };
    if tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
        return Ok(dir);
    }
    if folder.is_some() && !create_custom_dirs {
        return Err(SchedulingError::MissingFolder(dir.display().to_string()));
    }
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| SchedulingError::Destination {
            path: dir.display().to_string(),
            source,
        })?;
    Ok(dir)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) struct JobExecutor {
    id: JobId,
    request: Arc<FetchRequest>,
    extractor: Arc<dyn Extractor>,
    events: mpsc::UnboundedSender<ExecutorEvent>,
    cancel: CancellationToken,
    grace: Duration,
    task: Option<(JoinHandle<()>, AbortHandle)>,
}

impl JobExecutor {
    /// Build the fetch request for `record`, downloading into `output_dir`
    /// (see [`prepare_output_dir`]).
    pub(crate) fn new(
        record: &JobRecord,
        config: &GrabqConfig,
        output_dir: PathBuf,
        extractor: Arc<dyn Extractor>,
        events: mpsc::UnboundedSender<ExecutorEvent>,
    ) -> Self {
        let output_template = if record.playlist {
            config.output_template_playlist.clone()
        } else {
            config.output_template.clone()
        };
        let request = FetchRequest {
            url: record.url.clone(),
            output_dir,
            output_template,
            chapter_template: config.output_template_chapter.clone(),
            format: formats::select(record.quality.as_deref(), record.format.as_deref()),
            playlist_item_limit: config.playlist_item_limit,
            extra_args: config.ytdlp_args.clone(),
        };
        Self {
            id: record.id.clone(),
            request: Arc::new(request),
            extractor,
            events,
            cancel: CancellationToken::new(),
            grace: config.stop_grace(),
            task: None,
        }
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.request.output_dir
    }

    pub(crate) fn is_running(&self) -> bool {
        matches!(&self.task, Some((handle, _)) if !handle.is_finished())
    }

    /// Spawn the fetch. No-op while already running.
    pub(crate) fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let id = self.id.clone();
        let request = Arc::clone(&self.request);
        let extractor = Arc::clone(&self.extractor);
        let cancel = self.cancel.clone();
        let progress_tx = self.events.clone();
        let progress_id = id.clone();

        let inner = tokio::spawn(async move {
            let on_progress = move |progress: FetchProgress| {
                let _ = progress_tx.send(ExecutorEvent::Progress {
                    id: progress_id.clone(),
                    progress,
                });
            };
            extractor.fetch(&request, &on_progress, cancel).await
        });
        let abort = inner.abort_handle();

        let events = self.events.clone();
        let outer = tokio::spawn(async move {
            let result = match inner.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    let msg = panic_message(e.into_panic());
                    tracing::error!(job_id = %id, "download task panicked: {}", msg);
                    Err(FetchError::WorkerCrashed(msg))
                }
                Err(_) => Err(FetchError::Canceled),
            };
            let _ = events.send(ExecutorEvent::Finished { id, result });
        });
        self.task = Some((outer, abort));
    }

    /// Cancel the fetch and wait for it to exit, aborting it after the grace period.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        let Some((mut outer, abort)) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(self.grace + ABORT_MARGIN, &mut outer)
            .await
            .is_err()
        {
            tracing::warn!(job_id = %self.id, "download did not stop in time; aborting");
            abort.abort();
            let _ = outer.await;
        }
    }
}
