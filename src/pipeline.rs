//! The daily run: search, enrich, lay out, render, write.
//!
//! Stories are enriched one after another. Per-story problems (an article
//! that cannot be fetched, a comment thread that cannot be loaded) only cost
//! that story its article or comments; a failed search, render or write ends
//! the run with an error.

use crate::api::HnClient;
use crate::error::Result;
use crate::models::{Digest, DigestEntry};
use crate::outputs::layout::layout_digest;
use crate::outputs::pdf::render_pdf;
use crate::outputs::runlog::{RunStatus, append_status};
use crate::outputs::{digest_path, write_atomically};
use crate::scrapers::article::ArticleFetcher;
use crate::utils::ensure_writable_dir;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub output_dir: PathBuf,
    /// Day whose stories are collected.
    pub date: NaiveDate,
    pub max_stories: usize,
    pub max_comments: usize,
    pub search_url: String,
    pub item_url: String,
    /// Timeout for HN API requests.
    pub request_timeout: Duration,
    /// Timeout for linked-article requests.
    pub article_timeout: Duration,
    pub max_article_chars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Written { path: PathBuf, stories: usize },
    /// The search returned no stories; no document was produced.
    NothingToPublish,
}

impl From<RunOutcome> for RunStatus {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Written { path, stories } => RunStatus::Success { path, stories },
            RunOutcome::NothingToPublish => RunStatus::Empty,
        }
    }
}

/// Produce the digest for `config.date` and write it into the output directory.
#[instrument(level = "info", skip_all, fields(date = %config.date))]
pub async fn run(config: &DigestConfig) -> Result<RunOutcome> {
    let t0 = Instant::now();
    ensure_writable_dir(&config.output_dir).await?;

    let client = HnClient::new(&config.search_url, &config.item_url, config.request_timeout)?;
    let fetcher = ArticleFetcher::new(config.article_timeout, config.max_article_chars)?;

    let digest = build_digest(
        &client,
        &fetcher,
        config.date,
        config.max_stories,
        config.max_comments,
    )
    .await?;

    if digest.is_empty() {
        warn!("No stories found for the day; nothing to write");
        return Ok(RunOutcome::NothingToPublish);
    }

    let layout = layout_digest(&digest);
    let bytes = render_pdf(&layout)?;
    let path = digest_path(&config.output_dir, config.date);
    write_atomically(&path, &bytes).await?;

    info!(
        path = %path.display(),
        stories = digest.len(),
        pages = layout.pages.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Digest complete"
    );
    Ok(RunOutcome::Written {
        path,
        stories: digest.len(),
    })
}

/// Run once and record the result in the run log.
///
/// A log that cannot be written is reported through `tracing` only.
pub async fn run_and_record(config: &DigestConfig) -> RunStatus {
    let status = match run(config).await {
        Ok(outcome) => RunStatus::from(outcome),
        Err(e) => {
            error!(error = %e, "Digest run failed");
            RunStatus::Failure {
                error: e.to_string(),
            }
        }
    };

    if let Err(e) = append_status(&config.output_dir, config.date, &status).await {
        error!(error = %e, "Could not append to the run log");
    }
    status
}

/// Collect the day's top stories with their articles and top comments.
///
/// # Errors
///
/// Only when the story search fails.
pub async fn build_digest(
    client: &HnClient,
    fetcher: &ArticleFetcher,
    date: NaiveDate,
    max_stories: usize,
    max_comments: usize,
) -> Result<Digest> {
    let stories = client.top_stories(date, max_stories).await?;
    let total = stories.len();

    let entries: Vec<DigestEntry> = stream::iter(stories.into_iter().enumerate())
        .then(|(i, story)| async move {
            info!(rank = i + 1, total, story_id = story.id, title = %story.title, "Enriching story");
            let article = fetcher.fetch_article(&story).await;
            let comments = match client.top_comments(story.id, max_comments).await {
                Ok(comments) => comments,
                Err(e) => {
                    warn!(story_id = story.id, error = %e, "Comments unavailable; continuing without");
                    Vec::new()
                }
            };
            DigestEntry {
                story,
                article,
                comments,
            }
        })
        .collect()
        .await;

    Ok(Digest::new(date, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{comment_json, mount_item};
    use crate::outputs::layout::ARTICLE_PLACEHOLDER;
    use crate::outputs::runlog::LOG_FILE_NAME;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_HTML: &str = r#"<html><body>
        <nav>Home | About | Subscribe to our newsletter</nav>
        <article>
          <h1>Why sequential pipelines are easy to reason about</h1>
          <p>Running one story at a time keeps the request pattern polite and the log output readable from top to bottom.</p>
          <p>Each stage hands a plain value to the next one, which makes every step simple to test in isolation.</p>
        </article>
        <footer>Copyright</footer>
    </body></html>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn hit(server: &MockServer, id: u64, points: i64, page: &str) -> serde_json::Value {
        json!({
            "objectID": id.to_string(),
            "title": format!("Story {id}"),
            "url": format!("{}/{page}", server.uri()),
            "points": points,
            "num_comments": 4,
            "author": "alice",
            "created_at_i": 1_792_200_000
        })
    }

    /// Three stories: a fetchable article with comments, a dead link with
    /// comments, and a fetchable article without comments.
    async fn three_story_server() -> MockServer {
        let server = MockServer::start().await;

        let hits = vec![
            hit(&server, 3, 50, "articles/three"),
            hit(&server, 1, 100, "articles/one"),
            hit(&server, 2, 80, "gone"),
        ];
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": hits })))
            .mount(&server)
            .await;

        for page in ["/articles/one", "/articles/three"] {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(ARTICLE_HTML, "text/html; charset=utf-8"),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        mount_item(&server, 1, json!({ "id": 1, "type": "story", "kids": [11, 12] })).await;
        mount_item(&server, 11, comment_json(11, 1)).await;
        mount_item(&server, 12, comment_json(12, 3)).await;
        mount_item(&server, 2, json!({ "id": 2, "type": "story", "kids": [21] })).await;
        mount_item(&server, 21, comment_json(21, 0)).await;
        mount_item(&server, 3, json!({ "id": 3, "type": "story" })).await;

        server
    }

    fn config(server: &MockServer, output_dir: PathBuf) -> DigestConfig {
        DigestConfig {
            output_dir,
            date: date(),
            max_stories: 10,
            max_comments: 5,
            search_url: format!("{}/api/v1/search", server.uri()),
            item_url: format!("{}/v0", server.uri()),
            request_timeout: Duration::from_secs(5),
            article_timeout: Duration::from_secs(5),
            max_article_chars: 12_000,
        }
    }

    #[tokio::test]
    async fn test_build_digest_three_stories() {
        let server = three_story_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().to_path_buf());
        let client = HnClient::new(&cfg.search_url, &cfg.item_url, cfg.request_timeout).unwrap();
        let fetcher = ArticleFetcher::new(cfg.article_timeout, cfg.max_article_chars).unwrap();

        let digest = build_digest(&client, &fetcher, date(), 10, 5).await.unwrap();

        let ids: Vec<u64> = digest.entries().iter().map(|e| e.story.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let [first, second, third] = digest.entries() else {
            panic!("expected three entries");
        };
        assert!(first.article.text.as_deref().unwrap().contains("polite"));
        assert_eq!(
            first.comments.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![12, 11]
        );
        assert!(second.article.text.is_none());
        assert_eq!(second.comments.len(), 1);
        assert!(third.article.text.is_some());
        assert!(third.comments.is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_digest_and_log() {
        let server = three_story_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().join("digests"));

        let status = run_and_record(&cfg).await;

        let pdf_path = cfg.output_dir.join("2026-10-17.pdf");
        assert_eq!(
            status,
            RunStatus::Success {
                path: pdf_path.clone(),
                stories: 3
            }
        );
        let bytes = std::fs::read(&pdf_path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let log = std::fs::read_to_string(cfg.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains(" SUCCESS date=2026-10-17 stories=3"));
    }

    #[tokio::test]
    async fn test_rendered_sections_match_stories() {
        let server = three_story_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().to_path_buf());
        let client = HnClient::new(&cfg.search_url, &cfg.item_url, cfg.request_timeout).unwrap();
        let fetcher = ArticleFetcher::new(cfg.article_timeout, cfg.max_article_chars).unwrap();

        let digest = build_digest(&client, &fetcher, date(), 10, 5).await.unwrap();
        let layout = layout_digest(&digest);

        let titles: Vec<&str> = layout.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["1. Story 1", "2. Story 2", "3. Story 3"]);

        let section_text = |index: usize| {
            let start = layout.sections[index].page;
            let end = layout
                .sections
                .get(index + 1)
                .map_or(layout.pages.len(), |s| s.page);
            layout.pages[start..end]
                .iter()
                .map(|p| p.text())
                .collect::<Vec<_>>()
                .join("\n")
        };

        assert!(section_text(0).contains("TOP 2 COMMENTS"));
        assert!(section_text(1).contains(ARTICLE_PLACEHOLDER));
        assert!(section_text(1).contains("TOP 1 COMMENTS"));
        assert!(!section_text(2).contains("COMMENTS"));
        assert!(!section_text(2).contains(ARTICLE_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_reruns_are_byte_identical() {
        let server = three_story_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().to_path_buf());
        let pdf_path = cfg.output_dir.join("2026-10-17.pdf");

        run(&cfg).await.unwrap();
        let first = std::fs::read(&pdf_path).unwrap();
        run(&cfg).await.unwrap();
        let second = std::fs::read(&pdf_path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_day_writes_no_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().to_path_buf());

        let status = run_and_record(&cfg).await;

        assert_eq!(status, RunStatus::Empty);
        assert!(!cfg.output_dir.join("2026-10-17.pdf").exists());
        let log = std::fs::read_to_string(cfg.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains(" EMPTY date=2026-10-17"));
    }

    #[tokio::test]
    async fn test_search_failure_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&server, tmp.path().to_path_buf());

        let status = run_and_record(&cfg).await;

        assert!(matches!(status, RunStatus::Failure { .. }));
        let log = std::fs::read_to_string(cfg.output_dir.join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains(" FAILURE date=2026-10-17 error="));
        assert!(log.contains("502"));
    }
}
