//! CLI for the grabq media download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use grabq_core::config;

use commands::{
    run_add, run_clear, run_formats, run_info, run_queue, run_remove, run_start, run_status,
};

/// Top-level CLI for grabq.
#[derive(Debug, Parser)]
#[command(name = "grabq")]
#[command(about = "grabq: media download queue driven by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add one or more URLs and download the queue until it is empty.
    Add {
        /// Media page or playlist URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Quality key (e.g. best, 1080, 720, 320).
        #[arg(long)]
        quality: Option<String>,

        /// Container format (e.g. mp4, mkv, mp3, flac).
        #[arg(long)]
        format: Option<String>,

        /// Sub-folder of the download directory.
        #[arg(long)]
        folder: Option<String>,

        /// Park the jobs as pending instead of downloading them.
        #[arg(long)]
        no_start: bool,
    },

    /// Download everything already queued.
    Run,

    /// Move pending jobs to the queue and download it.
    Start {
        /// Job identifiers.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show all jobs.
    Status,

    /// Print metadata for a URL without downloading.
    Info {
        url: String,
    },

    /// List the supported formats and qualities.
    Formats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Forget all finished jobs.
    Clear,

    /// Remove a job by ID.
    Remove {
        /// Job identifier.
        id: String,

        /// List to remove it from: queue, pending or done.
        #[arg(long, default_value = "queue")]
        from: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Add {
                urls,
                quality,
                format,
                folder,
                no_start,
            } => run_add(cfg, urls, quality, format, folder, !no_start).await?,
            CliCommand::Run => run_queue(cfg).await?,
            CliCommand::Start { ids } => run_start(cfg, ids).await?,
            CliCommand::Status => run_status(&cfg).await?,
            CliCommand::Info { url } => run_info(&cfg, &url).await?,
            CliCommand::Formats { json } => run_formats(json)?,
            CliCommand::Clear => run_clear(&cfg).await?,
            CliCommand::Remove { id, from } => run_remove(&cfg, &id, &from).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
