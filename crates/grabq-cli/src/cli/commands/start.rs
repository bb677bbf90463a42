//! `grabq start <id>...` – queue pending jobs and download them.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::JobId;

use super::run::{drive_queue, open_engine};

pub async fn run_start(cfg: GrabqConfig, ids: Vec<String>) -> Result<()> {
    let engine = open_engine(cfg).await?;
    let pending = engine.list_pending().await?;
    let ids: Vec<JobId> = ids.into_iter().map(JobId::from).collect();
    for id in &ids {
        if !pending.iter().any(|r| r.id == *id) {
            eprintln!("No pending job {}", id);
        }
    }
    engine.start(ids).await?;
    drive_queue(&engine).await?;
    engine.close().await?;
    Ok(())
}
