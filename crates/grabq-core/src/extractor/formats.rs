//! Abstract `(quality, format)` → backend format selector and post-processing.
//!
//! Pure and total: absent or unrecognized inputs fall back to the best
//! available video+audio.

use serde::{Deserialize, Serialize};

/// Default selector: best video merged with best audio, or best single file.
pub const DEFAULT_SELECTOR: &str = "bestvideo+bestaudio/best";
const BEST_AUDIO: &str = "bestaudio";

/// Audio container formats: (key, display name, codec, preferred kbit/s).
const AUDIO_FORMATS: &[(&str, &str, &str, Option<&str>)] = &[
    ("mp3", "MP3", "mp3", Some("192")),
    ("m4a", "M4A", "m4a", None),
    ("flac", "FLAC", "flac", None),
    ("opus", "Opus", "opus", None),
    ("vorbis", "Vorbis", "vorbis", None),
    ("wav", "WAV", "wav", None),
];

/// Video container formats: (key, display name).
const VIDEO_FORMATS: &[(&str, &str)] = &[
    ("mp4", "MP4"),
    ("webm", "WebM"),
    ("mkv", "MKV"),
    ("avi", "AVI"),
    ("mov", "MOV"),
];

/// Audio qualities: (key, display name, selector).
const AUDIO_QUALITIES: &[(&str, &str, &str)] = &[
    ("best", "Best", "bestaudio"),
    ("320", "320k", "bestaudio[abr<=320]"),
    ("256", "256k", "bestaudio[abr<=256]"),
    ("192", "192k", "bestaudio[abr<=192]"),
    ("128", "128k", "bestaudio[abr<=128]"),
];

/// Video qualities: (key, display name, max height; `None` = best).
const VIDEO_QUALITIES: &[(&str, &str, Option<u32>)] = &[
    ("best", "Best", None),
    ("4k", "4K", Some(2160)),
    ("1440", "1440p", Some(1440)),
    ("1080", "1080p", Some(1080)),
    ("720", "720p", Some(720)),
    ("480", "480p", Some(480)),
    ("360", "360p", Some(360)),
    ("240", "240p", Some(240)),
    ("144", "144p", Some(144)),
];

/// A post-processing step the backend runs after the download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcessStep {
    /// Extract the audio track and transcode it to `codec`.
    ExtractAudio {
        codec: String,
        quality: Option<String>,
    },
}

/// Backend selector plus the post-processing implied by the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSelection {
    pub selector: String,
    pub post_processing: Vec<PostProcessStep>,
}

impl Default for FormatSelection {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_string(),
            post_processing: Vec::new(),
        }
    }
}

pub fn is_audio_format(format: &str) -> bool {
    AUDIO_FORMATS.iter().any(|(k, ..)| *k == format)
}

pub fn is_video_format(format: &str) -> bool {
    VIDEO_FORMATS.iter().any(|(k, _)| *k == format)
}

/// Formats that play natively on iOS.
pub fn ios_compatible_formats() -> &'static [&'static str] {
    &["mp4", "m4a", "mov"]
}

fn audio_quality_selector(quality: &str) -> Option<&'static str> {
    AUDIO_QUALITIES
        .iter()
        .find(|(k, ..)| *k == quality)
        .map(|(_, _, sel)| *sel)
}

fn video_quality_selector(quality: &str) -> Option<String> {
    VIDEO_QUALITIES
        .iter()
        .find(|(k, ..)| *k == quality)
        .map(|(_, _, height)| match height {
            None => DEFAULT_SELECTOR.to_string(),
            Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
        })
}

/// Backend selector string for a `(quality, format)` pair.
pub fn selector_for(quality: Option<&str>, format: Option<&str>) -> String {
    let quality = quality.map(str::trim).filter(|s| !s.is_empty());
    let format = format.map(str::trim).filter(|s| !s.is_empty());

    match (quality, format) {
        (None, None) => DEFAULT_SELECTOR.to_string(),
        (q, Some(f)) if is_audio_format(f) => q
            .and_then(audio_quality_selector)
            .unwrap_or(BEST_AUDIO)
            .to_string(),
        (q, Some(f)) if is_video_format(f) => q
            .and_then(video_quality_selector)
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        (Some(q), _) => video_quality_selector(q)
            .or_else(|| audio_quality_selector(q).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        (None, Some(_)) => DEFAULT_SELECTOR.to_string(),
    }
}

/// Post-processing steps required by `format` (audio extraction for audio formats).
pub fn post_processing_for(format: Option<&str>) -> Vec<PostProcessStep> {
    let Some(format) = format.map(str::trim) else {
        return Vec::new();
    };
    AUDIO_FORMATS
        .iter()
        .find(|(k, ..)| *k == format)
        .map(|(_, _, codec, quality)| {
            vec![PostProcessStep::ExtractAudio {
                codec: codec.to_string(),
                quality: quality.map(str::to_string),
            }]
        })
        .unwrap_or_default()
}

/// Full selection for a job.
pub fn select(quality: Option<&str>, format: Option<&str>) -> FormatSelection {
    FormatSelection {
        selector: selector_for(quality, format),
        post_processing: post_processing_for(format),
    }
}

/// One selectable option: key and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    pub key: &'static str,
    pub name: &'static str,
}

/// Formats and qualities offered for one media kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatGroup {
    pub formats: Vec<FormatOption>,
    pub qualities: Vec<FormatOption>,
}

/// Catalogue of everything `select` understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCatalogue {
    pub audio: FormatGroup,
    pub video: FormatGroup,
}

pub fn available_formats() -> FormatCatalogue {
    FormatCatalogue {
        audio: FormatGroup {
            formats: AUDIO_FORMATS
                .iter()
                .map(|&(key, name, ..)| FormatOption { key, name })
                .collect(),
            qualities: AUDIO_QUALITIES
                .iter()
                .map(|&(key, name, _)| FormatOption { key, name })
                .collect(),
        },
        video: FormatGroup {
            formats: VIDEO_FORMATS
                .iter()
                .map(|&(key, name)| FormatOption { key, name })
                .collect(),
            qualities: VIDEO_QUALITIES
                .iter()
                .map(|&(key, name, _)| FormatOption { key, name })
                .collect(),
        },
    }
}
