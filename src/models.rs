//! Data models for stories, articles, comments and the assembled digest.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchResponse`] / [`SearchHit`]: raw payload of the HN search API
//! - [`HnItem`]: raw payload of the HN item API (stories and comments)
//! - [`Story`], [`Article`], [`Comment`]: the cleaned records the renderer consumes
//! - [`Digest`]: one day's ordered entries, capped at [`MAX_STORIES`]
//!
//! Raw payloads mirror the upstream JSON and are converted once, at the API
//! boundary, into the owned records below.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use url::Url;

/// Hard upper bound on the number of stories in a digest.
pub const MAX_STORIES: usize = 10;

/// Default number of comments kept per story.
pub const MAX_COMMENTS: usize = 5;

/// Author shown when the upstream record has none.
pub const UNKNOWN_AUTHOR: &str = "[unknown]";

/// Body of a `GET /api/v1/search` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// A single story hit returned by the search API.
///
/// Most fields are optional upstream: jobs and some old stories carry no
/// points, and deleted authors come back as `null`.
#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub story_text: Option<String>,
    pub points: Option<i64>,
    pub num_comments: Option<i64>,
    pub author: Option<String>,
    pub created_at_i: Option<i64>,
}

/// An item from the Firebase item API. Stories and comments share this shape.
#[derive(Debug, Deserialize)]
pub struct HnItem {
    pub id: u64,
    pub by: Option<String>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub kids: Vec<u64>,
    pub text: Option<String>,
    pub time: Option<i64>,
    pub r#type: Option<String>,
}

impl HnItem {
    /// `true` for live comments that still carry a body.
    pub fn is_visible_comment(&self) -> bool {
        self.r#type.as_deref() == Some("comment")
            && !self.deleted
            && !self.dead
            && self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One Hacker News submission and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: u64,
    pub title: String,
    /// External link; `None` for Ask HN and other self-posts.
    pub url: Option<String>,
    /// HTML body of a self-post.
    pub story_text: Option<String>,
    pub points: i64,
    pub num_comments: i64,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Convert a search hit, dropping hits without a usable id or title.
    pub fn from_hit(hit: SearchHit) -> Option<Self> {
        let id = hit.object_id.parse::<u64>().ok()?;
        let title = hit.title.filter(|t| !t.trim().is_empty())?;
        let created_at = hit
            .created_at_i
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();

        Some(Self {
            id,
            title,
            url: hit.url.filter(|u| !u.trim().is_empty()),
            story_text: hit.story_text.filter(|t| !t.trim().is_empty()),
            points: hit.points.unwrap_or(0),
            num_comments: hit.num_comments.unwrap_or(0),
            author: hit.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            created_at,
        })
    }

    /// Discussion page on news.ycombinator.com.
    pub fn hn_url(&self) -> String {
        format!("https://news.ycombinator.com/item?id={}", self.id)
    }

    /// Host of the external link without a leading `www.`.
    /// For example: "https://www.example.com/post" -> "example.com"
    pub fn domain(&self) -> Option<String> {
        let parsed = Url::parse(self.url.as_deref()?).ok()?;
        let host = parsed.host_str()?;
        Some(host.trim_start_matches("www.").to_string())
    }
}

/// Readable text extracted for a story.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub story_id: u64,
    /// Plain text, paragraphs separated by a blank line. `None` when nothing
    /// readable could be extracted.
    pub text: Option<String>,
}

impl Article {
    pub fn unavailable(story_id: u64) -> Self {
        Self {
            story_id,
            text: None,
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.text
            .as_deref()
            .unwrap_or_default()
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// A comment selected for the digest.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    /// Plain text converted from HN's HTML, paragraphs separated by a blank line.
    pub text: String,
    /// Number of direct replies; the engagement signal used for ranking.
    pub reply_count: usize,
    pub story_id: u64,
    pub posted_at: DateTime<Utc>,
    /// Index of the comment in the story's `kids` list (HN's own ordering).
    pub position: usize,
}

/// One story together with its enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub story: Story,
    pub article: Article,
    pub comments: Vec<Comment>,
}

/// The single document covering one day's top stories.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    /// The day the stories were posted on.
    pub date: NaiveDate,
    entries: Vec<DigestEntry>,
}

impl Digest {
    /// Assemble a digest, ordering entries by descending score and keeping at
    /// most [`MAX_STORIES`]. Equal scores keep a stable order by story id.
    pub fn new(date: NaiveDate, mut entries: Vec<DigestEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.story
                .points
                .cmp(&a.story.points)
                .then(a.story.id.cmp(&b.story.id))
        });
        entries.truncate(MAX_STORIES);
        Self { date, entries }
    }

    pub fn entries(&self) -> &[DigestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
