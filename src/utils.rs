//! Utility functions for dates, string shortening and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Date arithmetic for the "yesterday, in UTC" digest window
//! - Character-safe truncation for logs, display URLs and article bodies
//! - File system validation for the output directory

use chrono::{Duration, NaiveDate, Utc};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;

/// The UTC calendar day before today.
pub fn yesterday_utc() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(1)
}

/// Unix timestamps of `[00:00, next 00:00)` UTC for `date`.
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end = start + Duration::days(1);
    (start.timestamp(), end.timestamp())
}

/// Long-form date used on the title page, e.g. "October 17, 2026".
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and byte count
/// indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Shorten a URL for display, keeping the first `max - 3` characters and
/// appending `...` when it is longer than `max`.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Truncate text to at most `max_chars` characters on a word boundary,
/// appending `...` when anything was cut.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    format!("{}...", head.trim_end())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    // A small sync write using std fs has the simpler error surface
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
