use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Largest accepted `retry.base_delay_secs`.
pub const MAX_RETRY_BASE_DELAY_SECS: u64 = 3600;

/// Spawn retry parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of spawn attempts per job (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds before the next admission attempt (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

/// Scheduling mode: a fixed cap on running downloads, or no cap at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    #[default]
    Limited,
    Unlimited,
}

/// Global configuration loaded from `~/.config/grabq/config.toml`.
///
/// Built once at startup and shared read-only (`Arc<GrabqConfig>`) by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabqConfig {
    /// Root directory for downloaded files.
    pub download_dir: PathBuf,
    /// Directory holding `queue.db`. `None` = XDG state dir (`~/.local/state/grabq`).
    pub state_dir: Option<PathBuf>,
    /// "limited" (default) or "unlimited".
    pub download_mode: DownloadMode,
    /// Maximum number of simultaneous downloads in limited mode.
    pub max_concurrent_downloads: usize,
    /// Output template for single items.
    pub output_template: String,
    /// Output template for playlist entries.
    pub output_template_playlist: String,
    /// Output template for split chapters.
    pub output_template_chapter: String,
    /// Stop after this many playlist entries (0 = no limit).
    pub playlist_item_limit: u32,
    /// Create a job's custom folder when it does not exist yet.
    pub create_custom_dirs: bool,
    /// yt-dlp executable (name on PATH or absolute path).
    pub ytdlp_path: PathBuf,
    /// Extra arguments passed to every yt-dlp download.
    pub ytdlp_args: Vec<String>,
    /// Seconds a canceled download gets to exit before it is killed.
    pub stop_grace_secs: u64,
    /// Upper bound on metadata resolution, in seconds.
    pub resolve_timeout_secs: u64,
    /// Optional spawn retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for GrabqConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            state_dir: None,
            download_mode: DownloadMode::Limited,
            max_concurrent_downloads: 3,
            output_template: "%(title)s.%(ext)s".to_string(),
            output_template_playlist: "%(playlist_title)s/%(title)s.%(ext)s".to_string(),
            output_template_chapter:
                "%(title)s - %(section_number)s %(section_title)s.%(ext)s".to_string(),
            playlist_item_limit: 0,
            create_custom_dirs: true,
            ytdlp_path: PathBuf::from("yt-dlp"),
            ytdlp_args: Vec::new(),
            stop_grace_secs: 5,
            resolve_timeout_secs: 120,
            retry: None,
        }
    }
}

impl GrabqConfig {
    /// Check values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.download_mode == DownloadMode::Limited && self.max_concurrent_downloads == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.output_template.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate("output_template"));
        }
        if self.output_template_playlist.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate("output_template_playlist"));
        }
        if self.output_template_chapter.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate("output_template_chapter"));
        }
        if let Some(retry) = &self.retry {
            let base = retry.base_delay_secs;
            if !base.is_finite() || base < 0.0 || base > MAX_RETRY_BASE_DELAY_SECS as f64 {
                return Err(ConfigError::InvalidRetryDelay {
                    value: base.to_string(),
                    max: MAX_RETRY_BASE_DELAY_SECS,
                });
            }
        }
        Ok(())
    }

    /// Concurrency cap, `None` when unlimited.
    pub fn concurrency_cap(&self) -> Option<usize> {
        match self.download_mode {
            DownloadMode::Limited => Some(self.max_concurrent_downloads),
            DownloadMode::Unlimited => None,
        }
    }

    /// Resolved state directory.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("grabq")?;
                Ok(xdg_dirs.get_state_home())
            }
        }
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs.max(1))
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads")
        .join("grabq")
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("grabq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GrabqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GrabqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: GrabqConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = GrabqConfig::default();
        assert_eq!(cfg.download_mode, DownloadMode::Limited);
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert_eq!(cfg.concurrency_cap(), Some(3));
        assert_eq!(cfg.output_template, "%(title)s.%(ext)s");
        assert_eq!(cfg.stop_grace_secs, 5);
        assert_eq!(cfg.retry_config().max_attempts, 3);
        assert!(cfg.download_dir.ends_with("Downloads/grabq"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = GrabqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: GrabqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent_downloads, cfg.max_concurrent_downloads);
        assert_eq!(parsed.download_dir, cfg.download_dir);
        assert_eq!(parsed.output_template_chapter, cfg.output_template_chapter);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            download_dir = "/srv/media"
            download_mode = "unlimited"
        "#;
        let cfg: GrabqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.download_dir, PathBuf::from("/srv/media"));
        assert_eq!(cfg.download_mode, DownloadMode::Unlimited);
        assert_eq!(cfg.concurrency_cap(), None);
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            max_concurrent_downloads = 1
            ytdlp_args = ["--no-mtime"]

            [retry]
            max_attempts = 5
            base_delay_secs = 0.25
            max_delay_secs = 4
        "#;
        let cfg: GrabqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.ytdlp_args, vec!["--no-mtime".to_string()]);
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert!((retry.base_delay_secs - 0.25).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 4);
    }

    #[test]
    fn zero_cap_is_rejected_only_in_limited_mode() {
        let mut cfg = GrabqConfig {
            max_concurrent_downloads: 0,
            ..GrabqConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroConcurrency));
        cfg.download_mode = DownloadMode::Unlimited;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_template_is_rejected() {
        let cfg = GrabqConfig {
            output_template_playlist: "  ".to_string(),
            ..GrabqConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyTemplate("output_template_playlist"))
        );
    }

    #[test]
    fn unusable_retry_delay_is_rejected() {
        for bad in [f64::INFINITY, f64::NAN, -1.0, 1e12] {
            let cfg = GrabqConfig {
                retry: Some(RetryConfig {
                    base_delay_secs: bad,
                    ..RetryConfig::default()
                }),
                ..GrabqConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidRetryDelay { .. })),
                "accepted base_delay_secs = {bad}"
            );
        }

        let toml = r#"
            [retry]
            max_attempts = 2
            base_delay_secs = inf
            max_delay_secs = 4
        "#;
        let cfg: GrabqConfig = toml::from_str(toml).unwrap();
        assert!(cfg.validate().is_err());
    }
}
