//! Command-line interface definitions for the HN daily digest.
//!
//! Every option has a default, so a bare invocation produces yesterday's
//! digest in `~/Documents/hn-digests`. All options can also be set through
//! environment variables, which suits cron and launchd jobs.

use crate::api::{DEFAULT_ITEM_URL, DEFAULT_SEARCH_URL};
use crate::error::{DigestError, Result};
use crate::models::{MAX_COMMENTS, MAX_STORIES};
use crate::pipeline::DigestConfig;
use crate::utils::yesterday_utc;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the HN daily digest.
///
/// # Examples
///
/// ```sh
/// # Yesterday's digest into the default directory
/// hn_daily_digest
///
/// # A specific day into a custom directory
/// hn_daily_digest -o ./digests -d 2026-10-17
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for the PDF and the run log [default: ~/Documents/hn-digests]
    #[arg(short, long, env = "HN_DIGEST_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Day to collect, as YYYY-MM-DD [default: yesterday, UTC]
    #[arg(short, long, env = "HN_DIGEST_DATE")]
    pub date: Option<NaiveDate>,

    /// Number of stories in the digest
    #[arg(
        long,
        env = "HN_DIGEST_MAX_STORIES",
        default_value_t = MAX_STORIES as u8,
        value_parser = clap::value_parser!(u8).range(1..=MAX_STORIES as i64)
    )]
    pub max_stories: u8,

    /// Comments shown per story
    #[arg(
        long,
        env = "HN_DIGEST_MAX_COMMENTS",
        default_value_t = MAX_COMMENTS as u8,
        value_parser = clap::value_parser!(u8).range(0..=20)
    )]
    pub max_comments: u8,

    /// Algolia search endpoint
    #[arg(long, env = "HN_SEARCH_URL", default_value = DEFAULT_SEARCH_URL)]
    pub search_url: String,

    /// Firebase item API base
    #[arg(long, env = "HN_ITEM_URL", default_value = DEFAULT_ITEM_URL)]
    pub item_url: String,

    /// Timeout for HN API requests, in seconds
    #[arg(long, env = "HN_DIGEST_REQUEST_TIMEOUT", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Timeout for fetching a linked article, in seconds
    #[arg(long, env = "HN_DIGEST_ARTICLE_TIMEOUT", default_value_t = 20)]
    pub article_timeout_secs: u64,

    /// Longest article text kept, in characters
    #[arg(long, env = "HN_DIGEST_MAX_ARTICLE_CHARS", default_value_t = 12_000)]
    pub max_article_chars: usize,
}

impl Cli {
    /// Resolve defaults that depend on the environment.
    ///
    /// # Errors
    ///
    /// When no output directory was given and the home directory is unknown,
    /// or a timeout is zero.
    pub fn into_config(self) -> Result<DigestConfig> {
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            None => default_output_dir()?,
        };
        if self.request_timeout_secs == 0 || self.article_timeout_secs == 0 {
            return Err(DigestError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }

        Ok(DigestConfig {
            output_dir,
            date: self.date.unwrap_or_else(yesterday_utc),
            max_stories: self.max_stories as usize,
            max_comments: self.max_comments as usize,
            search_url: self.search_url,
            item_url: self.item_url,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            article_timeout: Duration::from_secs(self.article_timeout_secs),
            max_article_chars: self.max_article_chars,
        })
    }
}

fn default_output_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("Documents").join("hn-digests"))
        .ok_or_else(|| {
            DigestError::Config("cannot locate home directory; pass --output-dir".to_string())
        })
}
