//! Command lines for the yt-dlp backend.

use crate::extractor::formats::PostProcessStep;
use crate::extractor::progress::PROGRESS_TEMPLATE;
use crate::extractor::FetchRequest;

/// Prefix of the line yt-dlp prints with the final file path.
pub(super) const FILE_PREFIX: &str = "[grabq-file]";

/// Arguments for a metadata-only lookup. Playlists are listed flat.
pub(super) fn resolve_args(url: &str) -> Vec<String> {
    [
        "-J",
        "--flat-playlist",
        "--no-warnings",
        "--skip-download",
        "--",
        url,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Arguments for a download.
pub(super) fn fetch_args(request: &FetchRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--newline".into(),
        "--progress".into(),
        "--progress-template".into(),
        PROGRESS_TEMPLATE.into(),
        "--no-simulate".into(),
        "--print".into(),
        format!("after_move:{} %(filepath)s", FILE_PREFIX),
        "-f".into(),
        request.format.selector.clone(),
    ];

    for step in &request.format.post_processing {
        match step {
            PostProcessStep::ExtractAudio { codec, quality } => {
                args.push("--extract-audio".into());
                args.push("--audio-format".into());
                args.push(codec.clone());
                if let Some(q) = quality {
                    args.push("--audio-quality".into());
                    args.push(format!("{}K", q));
                }
            }
        }
    }

    args.push("-P".into());
    args.push(request.output_dir.to_string_lossy().into_owned());
    args.push("-o".into());
    args.push(request.output_template.clone());
    args.push("-o".into());
    args.push(format!("chapter:{}", request.chapter_template));

    if request.playlist_item_limit > 0 {
        args.push("--playlist-end".into());
        args.push(request.playlist_item_limit.to_string());
    }

    args.extend(request.extra_args.iter().cloned());
    args.push("--".into());
    args.push(request.url.clone());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::formats;
    use std::path::PathBuf;

    fn request(format: Option<&str>, limit: u32) -> FetchRequest {
        FetchRequest {
            url: "https://video.example/watch?v=1".to_string(),
            output_dir: PathBuf::from("/srv/media/music"),
            output_template: "%(title)s.%(ext)s".to_string(),
            chapter_template: "%(title)s - %(section_number)s.%(ext)s".to_string(),
            format: formats::select(None, format),
            playlist_item_limit: limit,
            extra_args: vec!["--no-mtime".to_string()],
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn resolve_is_metadata_only() {
        let args = resolve_args("https://video.example/list");
        assert!(args.contains(&"-J".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert_eq!(args.last().unwrap(), "https://video.example/list");
    }

    #[test]
    fn video_fetch_has_selector_and_paths() {
        let args = fetch_args(&request(Some("mp4"), 0));
        assert_eq!(value_after(&args, "-f"), Some(formats::DEFAULT_SELECTOR));
        assert_eq!(value_after(&args, "-P"), Some("/srv/media/music"));
        assert_eq!(value_after(&args, "-o"), Some("%(title)s.%(ext)s"));
        assert!(args.iter().any(|a| a.starts_with("chapter:")));
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(!args.contains(&"--playlist-end".to_string()));
    }

    #[test]
    fn audio_fetch_extracts_audio() {
        let args = fetch_args(&request(Some("mp3"), 0));
        assert_eq!(value_after(&args, "-f"), Some("bestaudio"));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));
    }

    #[test]
    fn playlist_limit_and_extra_args_precede_url() {
        let args = fetch_args(&request(None, 25));
        assert_eq!(value_after(&args, "--playlist-end"), Some("25"));
        let extra = args.iter().position(|a| a == "--no-mtime").unwrap();
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert!(extra < sep);
        assert_eq!(args[sep + 1], "https://video.example/watch?v=1");
        assert_eq!(args.len(), sep + 2);
    }
}
