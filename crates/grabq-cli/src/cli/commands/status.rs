//! `grabq status` – show every job in the persisted lists.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::store::StateStore;
use grabq_core::ListKind;

pub async fn run_status(cfg: &GrabqConfig) -> Result<()> {
    let store = StateStore::open_in_dir(cfg.state_dir()?).await?;
    let snapshot = store.try_load().await?;
    store.close().await;

    if snapshot.is_empty() {
        println!("No jobs.");
        return Ok(());
    }
    println!(
        "{:<36} {:<8} {:<12} {:>6}  {}",
        "ID", "LIST", "STATUS", "DONE", "TITLE / URL"
    );
    for kind in [ListKind::Queued, ListKind::Pending, ListKind::Completed] {
        for j in snapshot.list(kind) {
            let name = if j.title.is_empty() { &j.url } else { &j.title };
            println!(
                "{:<36} {:<8} {:<12} {:>5.1}%  {}",
                j.id,
                kind.store_key(),
                j.status.as_str(),
                j.progress * 100.0,
                name
            );
            if !j.last_error.is_empty() {
                println!("{:<36} {}", "", j.last_error);
            }
        }
    }
    Ok(())
}
