//! Extractor whose downloads finish only when the test releases them.
//!
//! URLs containing `unresolvable` fail resolution; URLs containing `fail` fail
//! the fetch after one progress report.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use grabq_core::error::{FetchError, ResolutionError};
use grabq_core::extractor::{
    Extractor, FetchOutcome, FetchProgress, FetchRequest, MediaInfo, ProgressFn,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct ScriptedExtractor {
    gated: bool,
    /// How long a canceled download takes to exit.
    stop_delay: Duration,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    started: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    canceled: AtomicUsize,
    finished: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedExtractor {
    /// Downloads block until `release`d.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gated: true,
            ..Self::default()
        })
    }

    /// Gated downloads that take `delay` to exit once canceled.
    pub fn slow_to_stop(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            gated: true,
            stop_delay: delay,
            ..Self::default()
        })
    }

    /// Downloads finish right after their progress report.
    pub fn instant() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gate(&self, url: &str) -> Arc<Notify> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(gates.entry(url.to_string()).or_default())
    }

    /// Let the download of `url` finish (now, or as soon as it starts).
    pub fn release(&self, url: &str) {
        self.gate(url).notify_one();
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn canceled(&self) -> usize {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Downloads that returned successfully.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, ResolutionError> {
        if url.contains("unresolvable") {
            return Err(ResolutionError::Unavailable("Video unavailable".to_string()));
        }
        Ok(MediaInfo {
            id: url.rsplit('/').next().unwrap_or_default().to_string(),
            title: format!("Title of {}", url),
            playlist: url.contains("playlist"),
            ..MediaInfo::default()
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        self.started.lock().unwrap().push(request.url.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        on_progress(FetchProgress {
            downloaded_bytes: 50,
            total_bytes: Some(100),
            speed_label: "50 B/s".to_string(),
            eta_label: "0:01".to_string(),
        });

        if request.url.contains("fail") {
            return Err(FetchError::Failed("HTTP Error 403: Forbidden".to_string()));
        }
        if self.gated {
            let gate = self.gate(&request.url);
            tokio::select! {
                _ = gate.notified() => {}
                _ = cancel.cancelled() => {
                    self.canceled.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(self.stop_delay).await;
                    return Err(FetchError::Canceled);
                }
            }
        }
        let name = request.url.rsplit('/').next().unwrap_or("media");
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(FetchOutcome {
            final_path: request.output_dir.join(format!("{}.mp4", name)),
        })
    }
}
