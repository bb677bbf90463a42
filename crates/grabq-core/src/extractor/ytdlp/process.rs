//! Running yt-dlp as a child process: output capture, progress and termination.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::extractor::progress::parse_progress_line;
use crate::extractor::{FetchOutcome, ProgressFn};

use super::args::FILE_PREFIX;
use super::info::error_line;

/// Stderr lines kept for the error message of a failed download.
const STDERR_TAIL: usize = 20;

fn command(binary: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run a metadata lookup to completion; returns (status, stdout, stderr).
pub(super) async fn run_to_end(
    binary: &Path,
    args: &[String],
) -> std::io::Result<(ExitStatus, Vec<u8>, String)> {
    let output = command(binary, args).output().await?;
    Ok((
        output.status,
        output.stdout,
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

async fn collect_tail<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Ask the child to exit, then kill it if it outlives `grace`.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: plain signal delivery to our own child process.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                return;
            }
            tracing::debug!(pid, "yt-dlp ignored SIGTERM; killing");
        }
    }
    #[cfg(not(unix))]
    let _ = grace;
    if let Err(e) = child.kill().await {
        tracing::warn!("failed to kill yt-dlp: {}", e);
    }
}

/// Run a download, forwarding progress until the child exits or `cancel` fires.
pub(super) async fn run_fetch(
    binary: &Path,
    args: &[String],
    fallback_path: PathBuf,
    on_progress: ProgressFn<'_>,
    cancel: CancellationToken,
    stop_grace: Duration,
) -> Result<FetchOutcome, FetchError> {
    let mut child = command(binary, args)
        .spawn()
        .map_err(|e| FetchError::Tool(format!("{}: {}", binary.display(), e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| FetchError::Tool("yt-dlp stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| FetchError::Tool("yt-dlp stderr not captured".to_string()))?;
    let stderr_task = tokio::spawn(collect_tail(stderr));

    let mut lines = BufReader::new(stdout).lines();
    let mut final_path: Option<PathBuf> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                terminate(&mut child, stop_grace).await;
                stderr_task.abort();
                return Err(FetchError::Canceled);
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(progress) = parse_progress_line(&line) {
                        on_progress(progress);
                    } else if let Some(path) = line.trim().strip_prefix(FILE_PREFIX) {
                        final_path = Some(PathBuf::from(path.trim()));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("reading yt-dlp output: {}", e);
                    break;
                }
            }
        }
    }

    let status = tokio::select! {
        _ = cancel.cancelled() => {
            terminate(&mut child, stop_grace).await;
            stderr_task.abort();
            return Err(FetchError::Canceled);
        }
        status = child.wait() => status.map_err(|e| FetchError::Tool(e.to_string()))?,
    };
    let stderr_tail = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(FetchOutcome {
            final_path: final_path.unwrap_or(fallback_path),
        })
    } else {
        Err(FetchError::Failed(
            error_line(&stderr_tail).unwrap_or_else(|| format!("yt-dlp exited with {}", status)),
        ))
    }
}
