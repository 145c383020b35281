//! The run log: one timestamped status line per run, appended to
//! `hn_digest.log` next to the digests.
//!
//! ```text
//! 2026-10-18T06:00:04Z SUCCESS date=2026-10-17 stories=10 path=/home/me/Documents/hn-digests/2026-10-17.pdf
//! 2026-10-19T06:00:01Z FAILURE date=2026-10-18 error=https://hn.algolia.com/api/v1/search returned HTTP 502
//! ```

use crate::error::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

pub const LOG_FILE_NAME: &str = "hn_digest.log";

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// The digest was written.
    Success { path: PathBuf, stories: usize },
    /// The search API had no stories for the day; nothing was written.
    Empty,
    Failure { error: String },
}

/// Format the log line for a run that finished at `at`.
pub fn status_line(at: DateTime<Utc>, date: NaiveDate, status: &RunStatus) -> String {
    let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let date = date.format("%Y-%m-%d");
    match status {
        RunStatus::Success { path, stories } => format!(
            "{timestamp} SUCCESS date={date} stories={stories} path={}",
            path.display()
        ),
        RunStatus::Empty => format!("{timestamp} EMPTY date={date} stories=0"),
        RunStatus::Failure { error } => {
            let error = error.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{timestamp} FAILURE date={date} error={error}")
        }
    }
}

/// Append the status line for this run to the log in `output_dir`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn append_status(output_dir: &Path, date: NaiveDate, status: &RunStatus) -> Result<()> {
    let path = output_dir.join(LOG_FILE_NAME);
    let line = status_line(Utc::now(), date, status);

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await?;
    info!(path = %path.display(), "Recorded run status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_792_303_204, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_success_line() {
        let status = RunStatus::Success {
            path: PathBuf::from("/d/2026-10-17.pdf"),
            stories: 10,
        };
        assert_eq!(
            status_line(at(), date(), &status),
            "2026-10-18T06:00:04Z SUCCESS date=2026-10-17 stories=10 path=/d/2026-10-17.pdf"
        );
    }

    #[test]
    fn test_failure_line_is_single_line() {
        let status = RunStatus::Failure {
            error: "connection reset\n  while reading body".to_string(),
        };
        let line = status_line(at(), date(), &status);
        assert!(!line.contains('\n'));
        assert!(line.ends_with("FAILURE date=2026-10-17 error=connection reset while reading body"));
    }

    #[tokio::test]
    async fn test_append_status_appends() {
        let tmp = tempfile::tempdir().unwrap();

        append_status(tmp.path(), date(), &RunStatus::Empty).await.unwrap();
        append_status(
            tmp.path(),
            date(),
            &RunStatus::Failure {
                error: "boom".to_string(),
            },
        )
        .await
        .unwrap();

        let log = std::fs::read_to_string(tmp.path().join(LOG_FILE_NAME)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" EMPTY date=2026-10-17"));
        assert!(lines[1].contains(" FAILURE date=2026-10-17 error=boom"));
    }
}
