//! Hacker News API access: the Algolia search API for a day's stories and the
//! Firebase item API for comment threads.
//!
//! Both APIs are read-only and consumed with a single best-effort request per
//! lookup; there is no retry or backoff. A failing search aborts the run,
//! whereas comment lookups degrade to fewer (or no) comments.
//!
//! # Comment ranking
//!
//! The first `limit + 10` top-level kids of a story are loaded (the slack
//! absorbs deleted and dead items), ranked by number of direct replies and,
//! for equal counts, by HN's own ordering. The top `limit` are kept.

use crate::error::{DigestError, Result};
use crate::models::{Comment, HnItem, SearchResponse, Story, UNKNOWN_AUTHOR};
use crate::scrapers::text::fragment_to_text;
use crate::utils::{day_bounds, truncate_for_log};
use chrono::{DateTime, NaiveDate};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
pub const DEFAULT_ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Number of search hits requested before sorting locally by score.
pub const SEARCH_CANDIDATES: usize = 50;

/// Extra top-level kids loaded beyond the requested comment count.
pub const COMMENT_SLACK: usize = 10;

/// Item lookups in flight at once for a single story.
const ITEM_FETCH_CONCURRENCY: usize = 4;

/// Client for the two Hacker News APIs.
#[derive(Debug, Clone)]
pub struct HnClient {
    client: Client,
    search_url: String,
    item_url: String,
}

impl HnClient {
    /// Create a client against the given API base URLs.
    ///
    /// `item_url` is the Firebase base, e.g. `https://hacker-news.firebaseio.com/v0`;
    /// items are read from `{item_url}/item/{id}.json`.
    pub fn new(search_url: &str, item_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            search_url: search_url.to_string(),
            item_url: item_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let t0 = Instant::now();
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched JSON"
        );
        serde_json::from_slice(&body).map_err(|e| {
            warn!(
                %url,
                error = %e,
                body_preview = %truncate_for_log(&String::from_utf8_lossy(&body), 200),
                "Unexpected JSON payload"
            );
            e.into()
        })
    }

    /// Top `limit` stories posted on `date` (UTC), by descending score.
    ///
    /// Returns fewer than `limit` when the API has fewer stories for that day.
    ///
    /// # Errors
    ///
    /// Any transport, status or decoding failure; the run cannot continue
    /// without its story list.
    #[instrument(level = "info", skip(self))]
    pub async fn top_stories(&self, date: NaiveDate, limit: usize) -> Result<Vec<Story>> {
        let (start, end) = day_bounds(date);
        let query = [
            ("tags", "story".to_string()),
            (
                "numericFilters",
                format!("created_at_i>={start},created_at_i<{end}"),
            ),
            ("hitsPerPage", SEARCH_CANDIDATES.max(limit).to_string()),
        ];

        let response: SearchResponse = self.get_json(&self.search_url, &query).await?;
        let hit_count = response.hits.len();

        let mut stories: Vec<Story> = response
            .hits
            .into_iter()
            .filter_map(Story::from_hit)
            .collect();
        stories.sort_by(|a, b| b.points.cmp(&a.points).then(a.id.cmp(&b.id)));
        stories.truncate(limit);

        info!(
            hits = hit_count,
            kept = stories.len(),
            "Fetched top stories"
        );
        Ok(stories)
    }

    /// Load one item. `Ok(None)` when the API knows no such item.
    #[instrument(level = "debug", skip(self))]
    pub async fn item(&self, id: u64) -> Result<Option<HnItem>> {
        let url = format!("{}/item/{}.json", self.item_url, id);
        self.get_json(&url, &[]).await
    }

    /// The `limit` most-replied-to top-level comments of a story.
    ///
    /// Comments that fail to load, were deleted or killed, or have no text are
    /// skipped. Fewer than `limit` comments are returned as-is.
    ///
    /// # Errors
    ///
    /// Only when the story item itself cannot be loaded.
    #[instrument(level = "info", skip(self))]
    pub async fn top_comments(&self, story_id: u64, limit: usize) -> Result<Vec<Comment>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let Some(story) = self.item(story_id).await? else {
            warn!("Story item not found");
            return Ok(Vec::new());
        };

        let candidates: Vec<(usize, u64)> = story
            .kids
            .iter()
            .copied()
            .take(limit + COMMENT_SLACK)
            .enumerate()
            .collect();

        let mut comments: Vec<Comment> = stream::iter(candidates)
            .map(|(position, id)| async move {
                match self.item(id).await {
                    Ok(Some(item)) if item.is_visible_comment() => {
                        Some(comment_from_item(item, story_id, position))
                    }
                    Ok(Some(_)) => {
                        debug!(comment_id = id, "Skipping deleted, dead or empty comment");
                        None
                    }
                    Ok(None) => {
                        debug!(comment_id = id, "Comment missing upstream");
                        None
                    }
                    Err(e) => {
                        debug!(comment_id = id, error = %e, "Comment lookup failed");
                        None
                    }
                }
            })
            .buffered(ITEM_FETCH_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect()
            .await;

        rank_comments(&mut comments);
        comments.truncate(limit);

        info!(count = comments.len(), "Selected top comments");
        Ok(comments)
    }
}

/// Most replies first; HN's own order breaks ties.
pub fn rank_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.reply_count
            .cmp(&a.reply_count)
            .then(a.position.cmp(&b.position))
    });
}

fn comment_from_item(item: HnItem, story_id: u64, position: usize) -> Comment {
    Comment {
        id: item.id,
        author: item.by.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        text: fragment_to_text(item.text.as_deref().unwrap_or_default()),
        reply_count: item.kids.len(),
        story_id,
        posted_at: item
            .time
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_default(),
        position,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn hit(id: u64, points: i64) -> serde_json::Value {
        json!({
            "objectID": id.to_string(),
            "title": format!("Story {id}"),
            "url": format!("https://example.com/{id}"),
            "points": points,
            "num_comments": 12,
            "author": "alice",
            "created_at_i": 1_792_200_000
        })
    }

    pub(crate) async fn mount_item(server: &MockServer, id: u64, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v0/item/{id}.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    pub(crate) fn comment_json(id: u64, replies: usize) -> serde_json::Value {
        json!({
            "id": id,
            "by": format!("user{id}"),
            "type": "comment",
            "text": format!("Comment {id}<p>More."),
            "time": 1_792_201_000,
            "kids": (1000..1000 + replies as u64).collect::<Vec<_>>()
        })
    }

    fn client(server: &MockServer) -> HnClient {
        HnClient::new(
            &format!("{}/api/v1/search", server.uri()),
            &format!("{}/v0", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_top_stories_sorted_and_limited() {
        let server = MockServer::start().await;
        let hits: Vec<_> = [(1, 30), (2, 300), (3, 120), (4, 5), (5, 250)]
            .iter()
            .map(|&(id, points)| hit(id, points))
            .collect();

        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("tags", "story"))
            .and(query_param(
                "numericFilters",
                "created_at_i>=1792195200,created_at_i<1792281600",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": hits })))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let stories = client(&server).top_stories(date, 3).await.unwrap();

        let points: Vec<i64> = stories.iter().map(|s| s.points).collect();
        assert_eq!(points, vec![300, 250, 120]);
    }

    #[tokio::test]
    async fn test_top_stories_fewer_than_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "hits": [hit(1, 10), hit(2, 20)] })),
            )
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let stories = client(&server).top_stories(date, 10).await.unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id, 2);
    }

    #[tokio::test]
    async fn test_top_stories_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let err = client(&server).top_stories(date, 10).await.unwrap_err();
        assert!(matches!(err, DigestError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_top_stories_bad_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let err = client(&server).top_stories(date, 10).await.unwrap_err();
        assert!(matches!(err, DigestError::Decode(_)));
    }

    #[tokio::test]
    async fn test_top_comments_ranked_by_replies() {
        let server = MockServer::start().await;
        mount_item(
            &server,
            100,
            json!({ "id": 100, "type": "story", "kids": [1, 2, 3, 4, 5, 6, 7] }),
        )
        .await;
        mount_item(&server, 1, comment_json(1, 0)).await;
        mount_item(&server, 2, comment_json(2, 4)).await;
        mount_item(&server, 3, json!({ "id": 3, "type": "comment", "deleted": true })).await;
        mount_item(&server, 4, comment_json(4, 4)).await;
        mount_item(&server, 5, json!(null)).await;
        mount_item(&server, 6, comment_json(6, 9)).await;
        mount_item(
            &server,
            7,
            json!({ "id": 7, "type": "comment", "dead": true, "text": "flagged", "kids": [1, 2, 3] }),
        )
        .await;

        let comments = client(&server).top_comments(100, 3).await.unwrap();

        let ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![6, 2, 4]);
        assert_eq!(comments[0].reply_count, 9);
        assert_eq!(comments[0].author, "user6");
        assert_eq!(comments[0].text, "Comment 6\n\nMore.");
        assert!(comments.iter().all(|c| c.story_id == 100));
    }

    #[tokio::test]
    async fn test_top_comments_no_padding() {
        let server = MockServer::start().await;
        mount_item(&server, 200, json!({ "id": 200, "type": "story", "kids": [11, 12] })).await;
        mount_item(&server, 11, comment_json(11, 1)).await;
        mount_item(&server, 12, comment_json(12, 0)).await;

        let comments = client(&server).top_comments(200, 5).await.unwrap();
        assert_eq!(comments.len(), 2);
    }

    #[tokio::test]
    async fn test_top_comments_failing_item_is_skipped() {
        let server = MockServer::start().await;
        mount_item(&server, 300, json!({ "id": 300, "type": "story", "kids": [21, 22] })).await;
        mount_item(&server, 21, comment_json(21, 2)).await;
        Mock::given(method("GET"))
            .and(path("/v0/item/22.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let comments = client(&server).top_comments(300, 5).await.unwrap();
        let ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![21]);
    }

    #[tokio::test]
    async fn test_top_comments_story_without_kids() {
        let server = MockServer::start().await;
        mount_item(&server, 400, json!({ "id": 400, "type": "story" })).await;

        let comments = client(&server).top_comments(400, 5).await.unwrap();
        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_top_comments_story_lookup_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(client(&server).top_comments(500, 5).await.is_err());
    }
}
