//! `grabq remove <id> [--from queue|pending|done]` – drop a job from a list.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::store::StateStore;
use grabq_core::{JobId, ListKind};

/// Edits the persisted lists directly; no engine is running in this process.
pub async fn run_remove(cfg: &GrabqConfig, id: &str, from: &str) -> Result<()> {
    let kind: ListKind = from.parse()?;
    let id = JobId::from(id);

    let store = StateStore::open_in_dir(cfg.state_dir()?).await?;
    let mut snapshot = store.try_load().await?;
    let list = snapshot.list_mut(kind);
    let before = list.len();
    list.retain(|r| r.id != id);
    let removed = before != list.len();
    if removed {
        store.save(&snapshot).await?;
    }
    store.close().await;

    if removed {
        println!("Removed job {id}");
    } else {
        println!("No job {id} in {kind}");
    }
    Ok(())
}
