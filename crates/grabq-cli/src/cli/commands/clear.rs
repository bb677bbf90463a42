//! `grabq clear` – forget all finished jobs.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::store::StateStore;

pub async fn run_clear(cfg: &GrabqConfig) -> Result<()> {
    let store = StateStore::open_in_dir(cfg.state_dir()?).await?;
    let mut snapshot = store.try_load().await?;
    let n = snapshot.completed.len();
    snapshot.completed.clear();
    store.save(&snapshot).await?;
    store.close().await;
    println!("Cleared {n} finished job(s)");
    Ok(())
}
