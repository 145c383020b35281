//! Linked-article fetching and readable-text extraction.
//!
//! Every story gets exactly one attempt: a single GET with a timeout, no
//! retries. Anything that goes wrong (missing URL, network error, non-HTML
//! response, nothing readable on the page) yields an [`Article`] without text
//! so the renderer can show a placeholder.
//!
//! # Extraction heuristic
//!
//! 1. Try well-known content containers (`<article>`, `<main>`, common CMS
//!    classes) in priority order; the first with at least
//!    [`MIN_CONTENT_CHARS`] characters of readable text wins.
//! 2. Otherwise collect every `<p>` of at least [`MIN_PARAGRAPH_CHARS`]
//!    characters that does not sit inside page chrome.

use crate::error::{DigestError, Result};
use crate::models::{Article, Story};
use crate::scrapers::text::{
    BOILERPLATE_TAGS, element_to_text, fragment_to_text, looks_unlikely, readable_text,
};
use crate::utils::truncate_at_word;
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// User-Agent sent with article requests.
pub const USER_AGENT: &str = concat!(
    "hn-daily-digest/",
    env!("CARGO_PKG_VERSION"),
    " (personal archival tool)"
);

/// Minimum readable characters for a container or the paragraph fallback.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Shorter paragraphs are treated as captions, bylines or buttons.
pub const MIN_PARAGRAPH_CHARS: usize = 40;

const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".article-body",
    ".entry-content",
    ".story-body",
    ".article__body",
    ".content-body",
    "#article-body",
    "#content",
    ".prose",
];

static CONTENT_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("body p").unwrap());

/// Downloads story links and turns them into [`Article`]s.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
    max_chars: usize,
}

impl ArticleFetcher {
    /// Build a fetcher whose requests give up after `timeout` and whose
    /// extracted text is capped at `max_chars` characters.
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client, max_chars })
    }

    /// Produce the article for a story. Never fails: problems are logged and
    /// result in an article without text.
    ///
    /// Self-posts (no external URL) use their own HTML body instead.
    #[instrument(level = "info", skip_all, fields(story_id = story.id))]
    pub async fn fetch_article(&self, story: &Story) -> Article {
        let text = match story.url.as_deref() {
            Some(url) => match self.fetch_readable(url).await {
                Ok(Some(text)) => {
                    info!(%url, chars = text.chars().count(), "Article extracted");
                    Some(text)
                }
                Ok(None) => {
                    warn!(%url, "No readable content at article URL");
                    None
                }
                Err(e) => {
                    warn!(%url, error = %e, "Could not fetch article");
                    None
                }
            },
            None => {
                debug!("Text post without external URL");
                story
                    .story_text
                    .as_deref()
                    .map(fragment_to_text)
                    .filter(|t| !t.is_empty())
                    .map(|t| truncate_at_word(&t, self.max_chars))
            }
        };

        match text {
            Some(text) => Article {
                story_id: story.id,
                text: Some(text),
            },
            None => Article::unavailable(story.id),
        }
    }

    async fn fetch_readable(&self, url: &str) -> Result<Option<String>> {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                debug!(%url, "Skipping URL that is not http(s)");
                return Ok(None);
            }
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(ct) = content_type.as_deref() {
            if !ct.contains("html") {
                debug!(%url, content_type = %ct, "Skipping non-HTML response");
                return Ok(None);
            }
        }

        let body = response.text().await?;
        Ok(extract_readable_text(&body, self.max_chars))
    }
}

/// Extract the main readable text of an HTML page.
///
/// Returns `None` when the page has less than [`MIN_CONTENT_CHARS`] of
/// readable text, which is what paywalls and script-rendered pages look like.
pub fn extract_readable_text(html: &str, max_chars: usize) -> Option<String> {
    let document = Html::parse_document(html);

    for selector in CONTENT_CANDIDATES.iter() {
        if let Some(element) = document.select(selector).next() {
            let text = readable_text(element);
            if text.chars().count() >= MIN_CONTENT_CHARS {
                return Some(truncate_at_word(&text, max_chars));
            }
        }
    }

    let text = document
        .select(&PARAGRAPH)
        .filter(|p| !inside_page_chrome(*p))
        .map(element_to_text)
        .filter(|t| t.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.chars().count() >= MIN_CONTENT_CHARS {
        Some(truncate_at_word(&text, max_chars))
    } else {
        None
    }
}

fn inside_page_chrome(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| {
            let name = a.value().name();
            name == "header" || BOILERPLATE_TAGS.contains(&name) || looks_unlikely(a)
        })
}
