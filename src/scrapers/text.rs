//! HTML to plain-text conversion that keeps paragraph structure.
//!
//! Block-level elements start a new paragraph, inline elements are flattened
//! into the surrounding text and whitespace inside a paragraph is collapsed.
//! Paragraphs are joined with a blank line, the shape [`crate::models::Article`]
//! and [`crate::models::Comment`] bodies use.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Class or id fragments that mark navigation and engagement widgets.
pub(crate) static UNLIKELY_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)comment|sidebar|share|social|promo|related|subscribe|newsletter|cookie|banner|breadcrumb|footer")
        .unwrap()
});

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

/// Elements whose text never belongs in a reading view.
pub(crate) const BOILERPLATE_TAGS: &[&str] = &[
    "aside", "button", "footer", "form", "head", "iframe", "nav", "noscript", "object", "script",
    "select", "style", "svg", "template",
];

/// Convert an HTML fragment (an HN comment or self-post body) to plain text.
pub fn fragment_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    element_to_text(fragment.root_element())
}

/// Plain text of everything below `element`, boilerplate tags excluded.
pub fn element_to_text(element: ElementRef<'_>) -> String {
    let mut collector = ParagraphCollector::default();
    collector.walk(element);
    collector.finish()
}

/// Like [`element_to_text`], additionally pruning descendants whose class or
/// id looks like page chrome (share bars, related links, comment widgets).
pub fn readable_text(element: ElementRef<'_>) -> String {
    let mut collector = ParagraphCollector {
        prune_unlikely: true,
        ..Default::default()
    };
    collector.walk(element);
    collector.finish()
}

/// `true` if the element carries a class or id matching [`UNLIKELY_CANDIDATE`].
pub(crate) fn looks_unlikely(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("class").is_some_and(|c| UNLIKELY_CANDIDATE.is_match(c))
        || value.attr("id").is_some_and(|i| UNLIKELY_CANDIDATE.is_match(i))
}

#[derive(Default)]
struct ParagraphCollector {
    paragraphs: Vec<String>,
    current: String,
    prune_unlikely: bool,
}

impl ParagraphCollector {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.current.push_str(text),
                Node::Element(el) => {
                    let name = el.name();
                    if BOILERPLATE_TAGS.contains(&name) {
                        continue;
                    }
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if self.prune_unlikely && looks_unlikely(child_el) {
                        continue;
                    }

                    let block = BLOCK_TAGS.contains(&name);
                    if block {
                        self.break_paragraph();
                    }
                    self.walk(child_el);
                    if block {
                        self.break_paragraph();
                    }
                }
                _ => {}
            }
        }
    }

    fn break_paragraph(&mut self) {
        let collapsed = WHITESPACE.replace_all(self.current.trim(), " ");
        if !collapsed.is_empty() {
            self.paragraphs.push(collapsed.into_owned());
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_paragraph();
        self.paragraphs.join("\n\n")
    }
}
