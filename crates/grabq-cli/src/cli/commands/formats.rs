//! `grabq formats` – list formats and qualities accepted by `add`.

use anyhow::Result;
use grabq_core::extractor::formats::{self, FormatGroup, FormatOption};

fn keys(opts: &[FormatOption]) -> String {
    opts.iter().map(|o| o.key).collect::<Vec<_>>().join(", ")
}

fn print_group(kind: &str, group: &FormatGroup) {
    println!("{kind}");
    println!("  formats:   {}", keys(&group.formats));
    println!("  qualities: {}", keys(&group.qualities));
}

pub fn run_formats(json: bool) -> Result<()> {
    let catalogue = formats::available_formats();
    if json {
        println!("{}", serde_json::to_string_pretty(&catalogue)?);
        return Ok(());
    }
    print_group("audio", &catalogue.audio);
    print_group("video", &catalogue.video);
    println!(
        "iOS compatible: {}",
        formats::ios_compatible_formats().join(", ")
    );
    Ok(())
}
