//! Progress reported by a running fetch, and the display labels derived from it.

/// Prefix marking the machine-readable progress lines we ask yt-dlp to print.
pub(crate) const PROGRESS_PREFIX: &str = "[grabq-progress]";

/// `--progress-template` producing lines `parse_progress_line` understands.
pub(crate) const PROGRESS_TEMPLATE: &str = "download:[grabq-progress] \
%(progress.downloaded_bytes)s %(progress.total_bytes)s \
%(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s";

/// Snapshot of one fetch's progress, as handed to the progress callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchProgress {
    pub downloaded_bytes: u64,
    /// Exact or estimated size; `None` when the backend does not know yet.
    pub total_bytes: Option<u64>,
    pub speed_label: String,
    pub eta_label: String,
}

impl FetchProgress {
    /// Fraction complete in [0.0, 1.0]; `None` without a known total.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded_bytes as f64 / total as f64).min(1.0)),
        }
    }
}

/// yt-dlp prints `NA` for unknown fields and floats for estimates.
fn parse_number(field: &str) -> Option<f64> {
    if field == "NA" || field == "None" {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse one stdout line produced by `PROGRESS_TEMPLATE`. Other lines yield `None`.
pub(crate) fn parse_progress_line(line: &str) -> Option<FetchProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let downloaded = parse_number(fields.next()?)?;
    let total = fields.next().and_then(parse_number);
    let estimate = fields.next().and_then(parse_number);
    let speed = fields.next().and_then(parse_number);
    let eta = fields.next().and_then(parse_number);

    Some(FetchProgress {
        downloaded_bytes: downloaded as u64,
        total_bytes: total.or(estimate).map(|t| t as u64),
        speed_label: speed.map(format_rate).unwrap_or_default(),
        eta_label: eta.map(|s| format_eta(s as u64)).unwrap_or_default(),
    })
}

/// Human-readable transfer rate, e.g. `1.50 MiB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Remaining time as `m:ss` or `h:mm:ss`.
pub fn format_eta(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
