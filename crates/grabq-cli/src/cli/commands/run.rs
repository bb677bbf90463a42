//! `grabq run` – download everything queued, printing progress until done.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::extractor::YtDlp;
use grabq_core::{JobStatus, QueueEngine, QueueEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub(super) async fn open_engine(cfg: GrabqConfig) -> Result<QueueEngine> {
    let extractor = Arc::new(YtDlp::from_config(&cfg));
    Ok(QueueEngine::open(cfg, extractor).await?)
}

fn label(title: &str, url: &str) -> String {
    if title.is_empty() {
        url.to_string()
    } else {
        title.to_string()
    }
}

fn print_event(event: &QueueEvent, last_progress: &mut Instant) {
    match event {
        QueueEvent::Added(r) => println!("queued     {}", label(&r.title, &r.url)),
        QueueEvent::Updated(r) if r.status == JobStatus::Downloading => {
            let now = Instant::now();
            if now.duration_since(*last_progress) >= PROGRESS_INTERVAL {
                println!(
                    "  {:5.1}%  {:>12}  ETA {:>8}  {}",
                    r.progress * 100.0,
                    r.speed,
                    r.eta,
                    label(&r.title, &r.url)
                );
                *last_progress = now;
            }
        }
        QueueEvent::Updated(_) => {}
        QueueEvent::Completed(r) => match r.status {
            JobStatus::Completed => println!("done       {}", r.destination_path),
            JobStatus::Canceled => println!("canceled   {}", label(&r.title, &r.url)),
            _ => println!("failed     {}: {}", label(&r.title, &r.url), r.last_error),
        },
        QueueEvent::Canceled(id) => println!("removed    {}", id),
        QueueEvent::Cleared => println!("history cleared"),
    }
}

/// Print events until the queue is empty or the user interrupts.
pub(super) async fn drive_queue(engine: &QueueEngine) -> Result<()> {
    let mut events = engine.subscribe();
    if engine.list_queued().await?.is_empty() {
        println!("No queued jobs.");
        return Ok(());
    }

    let mut last_progress = Instant::now()
        .checked_sub(PROGRESS_INTERVAL)
        .unwrap_or_else(Instant::now);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted; unfinished jobs stay queued.");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event, &mut last_progress);
                    if matches!(event, QueueEvent::Completed(_) | QueueEvent::Canceled(_))
                        && engine.list_queued().await?.is_empty()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::debug!("skipped {} progress events", n),
                Err(RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}

pub async fn run_queue(cfg: GrabqConfig) -> Result<()> {
    let engine = open_engine(cfg).await?;
    drive_queue(&engine).await?;
    engine.close().await?;
    Ok(())
}
