//! `grabq info <url>` – print resolved metadata as JSON.

use anyhow::Result;
use grabq_core::config::GrabqConfig;
use grabq_core::extractor::{Extractor, YtDlp};
use grabq_core::validate::validate_source_url;

pub async fn run_info(cfg: &GrabqConfig, url: &str) -> Result<()> {
    let url = validate_source_url(url)?;
    let info = YtDlp::from_config(cfg).resolve(&url).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
