//! # HN Daily Digest
//!
//! Collects the previous day's ten highest-scoring Hacker News stories, the
//! readable text of each linked article and each story's most-discussed
//! top-level comments, and renders everything into one dated PDF.
//!
//! ## Usage
//!
//! ```sh
//! hn_daily_digest                       # yesterday, ~/Documents/hn-digests
//! hn_daily_digest -o ./digests -d 2026-10-17
//! ```
//!
//! ## Architecture
//!
//! The application is a linear pipeline:
//! 1. **Search**: the day's top stories from the Algolia HN API
//! 2. **Enrich**: per story, the linked article and the top comments
//! 3. **Layout**: pages, links and bookmarks computed from the digest
//! 4. **Output**: the PDF written atomically, plus one line in `hn_digest.log`

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use outputs::runlog::RunStatus;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hn_daily_digest starting up");

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        output_dir = %config.output_dir.display(),
        date = %config.date,
        max_stories = config.max_stories,
        max_comments = config.max_comments,
        "Resolved configuration"
    );

    let status = pipeline::run_and_record(&config).await;

    let elapsed = start_time.elapsed();
    match status {
        RunStatus::Success { path, stories } => {
            info!(path = %path.display(), stories, ?elapsed, "Execution complete");
            ExitCode::SUCCESS
        }
        RunStatus::Empty => {
            info!(?elapsed, "Execution complete; no stories for the day");
            ExitCode::SUCCESS
        }
        RunStatus::Failure { error } => {
            error!(%error, ?elapsed, "Execution failed");
            ExitCode::FAILURE
        }
    }
}
