//! yt-dlp backend for the [`Extractor`] trait.

mod args;
mod info;
mod process;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::GrabqConfig;
use crate::error::{FetchError, ResolutionError};

use super::{Extractor, FetchOutcome, FetchRequest, MediaInfo, ProgressFn};

/// Drives the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    resolve_timeout: Duration,
    stop_grace: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            resolve_timeout: Duration::from_secs(120),
            stop_grace: Duration::from_secs(5),
        }
    }

    pub fn from_config(cfg: &GrabqConfig) -> Self {
        Self {
            binary: cfg.ytdlp_path.clone(),
            resolve_timeout: cfg.resolve_timeout(),
            stop_grace: cfg.stop_grace(),
        }
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, ResolutionError> {
        let argv = args::resolve_args(url);
        let run = process::run_to_end(&self.binary, &argv);
        let (status, stdout, stderr) = tokio::time::timeout(self.resolve_timeout, run)
            .await
            .map_err(|_| ResolutionError::Timeout(self.resolve_timeout.as_secs()))?
            .map_err(|e| ResolutionError::Tool(format!("{}: {}", self.binary.display(), e)))?;

        if !status.success() {
            tracing::debug!(url, %status, "yt-dlp resolve failed");
            return Err(info::classify_resolve_failure(url, &stderr));
        }
        info::parse_media_info(&stdout)
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let argv = args::fetch_args(request);
        tracing::debug!(url = %request.url, dir = %request.output_dir.display(), "starting yt-dlp");
        process::run_fetch(
            &self.binary,
            &argv,
            request.output_dir.clone(),
            on_progress,
            cancel,
            self.stop_grace,
        )
        .await
    }
}
