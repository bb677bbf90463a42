//! `grabq add <url>...` – add jobs, then download the queue.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::AddRequest;

use super::run::{drive_queue, open_engine};

pub async fn run_add(
    cfg: GrabqConfig,
    urls: Vec<String>,
    quality: Option<String>,
    format: Option<String>,
    folder: Option<String>,
    auto_start: bool,
) -> Result<()> {
    let engine = open_engine(cfg).await?;
    let mut added = 0usize;
    for url in urls {
        let request = AddRequest {
            url: url.clone(),
            quality: quality.clone(),
            format: format.clone(),
            folder: folder.clone(),
            auto_start,
        };
        match engine.add(request).await {
            Ok(rec) => {
                added += 1;
                println!("Added {} ({})", rec.id, rec.status.as_str());
            }
            Err(e) => eprintln!("Could not add {}: {}", url, e),
        }
    }

    if auto_start && added > 0 {
        drive_queue(&engine).await?;
    }
    engine.close().await?;
    Ok(())
}
