//! Extractor adapter: the boundary around the external media tool.
//!
//! The engine only depends on the [`Extractor`] trait. [`YtDlp`] is the
//! concrete backend; tests plug in scripted implementations.

pub mod formats;
mod progress;
mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, ResolutionError};

pub use formats::{FormatSelection, PostProcessStep};
pub use progress::{format_eta, format_rate, FetchProgress};
pub use ytdlp::YtDlp;

/// Metadata returned by `resolve`, without downloading anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_seconds: f64,
    pub uploader: String,
    pub description: String,
    pub view_count: u64,
    /// The URL names a playlist rather than a single item.
    pub playlist: bool,
}

/// Everything a backend needs to fetch one job.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Directory the output template is resolved against.
    pub output_dir: PathBuf,
    /// Output template for the item (single or playlist variant).
    pub output_template: String,
    /// Output template for split chapters.
    pub chapter_template: String,
    pub format: FormatSelection,
    /// Stop after this many playlist entries (0 = no limit).
    pub playlist_item_limit: u32,
    /// Extra backend arguments from configuration.
    pub extra_args: Vec<String>,
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub final_path: PathBuf,
}

/// Callback invoked with progress at backend-determined intervals.
pub type ProgressFn<'a> = &'a (dyn Fn(FetchProgress) + Send + Sync);

/// Capability interface over the media-extraction tool.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve `url` to metadata without downloading.
    async fn resolve(&self, url: &str) -> Result<MediaInfo, ResolutionError>;

    /// Download `request`, reporting progress through `on_progress`.
    ///
    /// Must return promptly with `FetchError::Canceled` once `cancel` fires.
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError>;
}
