//! Shared helpers for engine integration tests.

#![allow(dead_code)]

pub mod scripted;

use std::path::Path;
use std::time::Duration;

use grabq_core::config::{GrabqConfig, RetryConfig};
use grabq_core::{QueueEngine, QueueEvent, QueueSnapshot};
use tokio::sync::broadcast;

/// Config rooted in temp dirs, with a fixed cap and fast retries.
pub fn test_config(download_dir: &Path, state_dir: &Path, cap: usize) -> GrabqConfig {
    GrabqConfig {
        download_dir: download_dir.to_path_buf(),
        state_dir: Some(state_dir.to_path_buf()),
        max_concurrent_downloads: cap,
        stop_grace_secs: 1,
        retry: Some(RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..GrabqConfig::default()
    }
}

/// Poll the engine until `pred` holds; panics after a few seconds.
pub async fn wait_until<F>(engine: &QueueEngine, what: &str, pred: F) -> QueueSnapshot
where
    F: Fn(&QueueSnapshot) -> bool,
{
    for _ in 0..500 {
        let snapshot = engine.list_all().await.expect("engine open");
        if pred(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Poll `pred` until it holds; panics after a few seconds.
pub async fn eventually<F: Fn() -> bool>(what: &str, pred: F) {
    for _ in 0..500 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Next event, skipping lag notices; panics after a few seconds.
pub async fn next_event(rx: &mut broadcast::Receiver<QueueEvent>) -> QueueEvent {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Ok(event)) => return event,
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => panic!("event channel closed"),
            Err(_) => panic!("no event within 5s"),
        }
    }
}

/// A job id appears in at most one list.
pub fn assert_exclusive(snapshot: &QueueSnapshot) {
    let mut seen = std::collections::HashSet::new();
    for rec in snapshot
        .queued
        .iter()
        .chain(&snapshot.pending)
        .chain(&snapshot.completed)
    {
        assert!(seen.insert(rec.id.clone()), "job {} is in two lists", rec.id);
    }
}
