//! Parsing of `yt-dlp -J` output and of its failure messages.

use serde::Deserialize;

use crate::error::ResolutionError;
use crate::extractor::MediaInfo;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    thumbnails: Vec<RawThumbnail>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    description: Option<String>,
    view_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawThumbnail {
    url: Option<String>,
}

pub(super) fn parse_media_info(json: &[u8]) -> Result<MediaInfo, ResolutionError> {
    let raw: RawInfo =
        serde_json::from_slice(json).map_err(|e| ResolutionError::InvalidOutput(e.to_string()))?;

    // Flat playlists carry a thumbnails list instead of a single thumbnail.
    let thumbnail_url = raw
        .thumbnail
        .or_else(|| raw.thumbnails.into_iter().rev().find_map(|t| t.url))
        .unwrap_or_default();

    Ok(MediaInfo {
        id: raw.id.unwrap_or_default(),
        title: raw.title.unwrap_or_default(),
        thumbnail_url,
        duration_seconds: raw.duration.unwrap_or(0.0),
        uploader: raw.uploader.or(raw.channel).unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        view_count: raw.view_count.unwrap_or(0),
        playlist: raw.kind.as_deref() == Some("playlist"),
    })
}

/// Last `ERROR:` line of yt-dlp's stderr, else its last non-empty line.
pub(super) fn error_line(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(|l| l.trim().to_string())
        .or_else(|| lines.last().map(|l| l.to_string()))
}

pub(super) fn classify_resolve_failure(url: &str, stderr: &str) -> ResolutionError {
    let message = error_line(stderr).unwrap_or_else(|| "yt-dlp failed".to_string());
    if message.contains("Unsupported URL") || message.contains("is not a valid URL") {
        ResolutionError::Unsupported(url.to_string())
    } else {
        ResolutionError::Unavailable(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_video() {
        let json = br#"{
            "_type": "video",
            "id": "abc123",
            "title": "Some talk",
            "thumbnail": "https://img.example/abc.jpg",
            "duration": 754,
            "uploader": "Conference",
            "description": "Recorded live.",
            "view_count": 4200
        }"#;
        let info = parse_media_info(json).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.title, "Some talk");
        assert_eq!(info.thumbnail_url, "https://img.example/abc.jpg");
        assert_eq!(info.duration_seconds, 754.0);
        assert_eq!(info.view_count, 4200);
        assert!(!info.playlist);
    }

    #[test]
    fn parses_flat_playlist_with_nulls() {
        let json = br#"{
            "_type": "playlist",
            "id": "PL1",
            "title": "Mixtape",
            "thumbnails": [{"url": "https://img.example/small.jpg"}, {"url": "https://img.example/big.jpg"}],
            "duration": null,
            "uploader": null,
            "channel": "Some channel",
            "view_count": null,
            "entries": [{"id": "1"}, {"id": "2"}]
        }"#;
        let info = parse_media_info(json).unwrap();
        assert!(info.playlist);
        assert_eq!(info.thumbnail_url, "https://img.example/big.jpg");
        assert_eq!(info.uploader, "Some channel");
        assert_eq!(info.duration_seconds, 0.0);
        assert_eq!(info.view_count, 0);
    }

    #[test]
    fn garbage_is_invalid_output() {
        assert!(matches!(
            parse_media_info(b"not json"),
            Err(ResolutionError::InvalidOutput(_))
        ));
    }

    #[test]
    fn error_line_prefers_error_prefix() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n\n";
        assert_eq!(error_line(stderr).as_deref(), Some("[youtube] abc: Video unavailable"));
        assert_eq!(error_line("just a line\n").as_deref(), Some("just a line"));
        assert_eq!(error_line("  \n"), None);
    }

    #[test]
    fn classifies_resolve_failures() {
        let unsupported = classify_resolve_failure(
            "https://nothing.example/",
            "ERROR: Unsupported URL: https://nothing.example/",
        );
        assert!(matches!(unsupported, ResolutionError::Unsupported(u) if u == "https://nothing.example/"));

        let gone = classify_resolve_failure("https://v.example/x", "ERROR: Private video");
        assert!(matches!(gone, ResolutionError::Unavailable(m) if m == "Private video"));
    }
}
