//! Boundary validation for add requests: source URLs and destination folders.

mod sanitize;

pub use sanitize::sanitize_path_component;

use crate::error::EngineError;

/// Accept only absolute http(s) URLs. Returns the URL unchanged (trimmed).
pub fn validate_source_url(raw: &str) -> Result<String, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("url must not be empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| EngineError::InvalidInput(format!("malformed url `{}`: {}", trimmed, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(EngineError::InvalidInput(format!(
                "unsupported url scheme `{}`",
                other
            )))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(EngineError::InvalidInput(format!("url has no host: {}", trimmed)));
    }
    Ok(trimmed.to_string())
}

/// Normalize an optional destination folder relative to the download directory.
///
/// Blank folders become `None` and one trailing separator is allowed. Absolute
/// paths, empty components and `.`/`..` components are rejected; every
/// remaining component is sanitized for the filesystem.
pub fn normalize_folder(folder: Option<&str>) -> Result<Option<String>, EngineError> {
    let Some(raw) = folder.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if raw.starts_with('/') || raw.starts_with('\\') {
        return Err(EngineError::InvalidInput(format!(
            "folder must be relative: {}",
            raw
        )));
    }
    let raw = raw.strip_suffix(['/', '\\']).unwrap_or(raw);
    let mut parts = Vec::new();
    for component in raw.split(['/', '\\']) {
        let component = component.trim();
        if component.is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "folder has an empty path component: {}",
                raw
            )));
        }
        if component == "." || component == ".." {
            return Err(EngineError::InvalidInput(format!(
                "folder may not contain `{}`: {}",
                component, raw
            )));
        }
        let clean = sanitize_path_component(component);
        if clean.is_empty() {
            return Err(EngineError::InvalidInput(format!("invalid folder: {}", raw)));
        }
        parts.push(clean);
    }
    Ok(Some(parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_source_url("  https://video.example/watch?v=1 ").unwrap(),
            "https://video.example/watch?v=1"
        );
        assert!(validate_source_url("http://example.com/x").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            validate_source_url("ftp://example.com/x"),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_source_url("not a url"),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_source_url(""),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn blank_folder_is_none() {
        assert_eq!(normalize_folder(None).unwrap(), None);
        assert_eq!(normalize_folder(Some("   ")).unwrap(), None);
    }

    #[test]
    fn nested_folder_is_sanitized() {
        assert_eq!(
            normalize_folder(Some("music/live sets")).unwrap(),
            Some("music/live sets".to_string())
        );
        assert_eq!(
            normalize_folder(Some("music/live/")).unwrap(),
            Some("music/live".to_string())
        );
    }

    #[test]
    fn empty_components_are_rejected() {
        for folder in ["a//b", "a/ /b", "a//", "//"] {
            assert!(
                matches!(normalize_folder(Some(folder)), Err(EngineError::InvalidInput(_))),
                "accepted {folder:?}"
            );
        }
    }

    #[test]
    fn traversal_and_absolute_folders_are_rejected() {
        assert!(normalize_folder(Some("../etc")).is_err());
        assert!(normalize_folder(Some("a/./b")).is_err());
        assert!(normalize_folder(Some("/srv/media")).is_err());
    }
}
