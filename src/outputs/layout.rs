//! Page layout for the digest document.
//!
//! [`layout_digest`] turns a [`Digest`] into a [`DocumentLayout`]: a list of
//! A4 pages holding positioned text runs, filled boxes, rules and link areas,
//! plus one [`SectionAnchor`] per story. Nothing here knows about PDF
//! objects; [`crate::outputs::pdf`] serialises the result.
//!
//! # Document structure
//!
//! ```text
//! page 1..   title block, table of contents (one linked entry per story)
//! page n..   one section per story, each starting on a fresh page:
//!            header band, metadata, "Article", optional "Top N Comments"
//! every page "Page X of Y" footer
//! ```
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.
//! Layout is a pure function of the digest, which keeps rendering
//! byte-for-byte reproducible.

use crate::models::{Comment, Digest, DigestEntry};
use crate::outputs::fonts::{Font, text_width, wrap_text};
use crate::utils::{ellipsize, long_date};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 36.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const FOOTER_BASELINE: f32 = 20.0;
/// Lowest y any body content may reach.
const BOTTOM_LIMIT: f32 = MARGIN;

pub const DOCUMENT_TITLE: &str = "Hacker News Daily Digest";
pub const ARTICLE_PLACEHOLDER: &str = "Article content could not be retrieved.";
const DISPLAY_URL_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

const ORANGE: Color = Color(1.0, 0.4, 0.0);
const LIGHT_ORANGE: Color = Color(1.0, 0.667, 0.4);
const INK: Color = Color(0.165, 0.165, 0.165);
const HEADING: Color = Color(0.1, 0.1, 0.1);
const MUTED: Color = Color(0.6, 0.6, 0.6);
const FOOTER: Color = Color(0.667, 0.667, 0.667);
const WHITE: Color = Color(1.0, 1.0, 1.0);
const PANEL: Color = Color(0.973, 0.973, 0.973);
const STRIPE: Color = Color(0.961, 0.961, 0.961);

/// A drawing instruction on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A single line of text with its baseline starting at (`x`, `y`).
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Color,
        text: String,
    },
    /// A filled rectangle with its lower-left corner at (`x`, `y`).
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    /// A stroked straight line.
    Rule {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Jump to the section of the story at this index of the digest.
    Section(usize),
    Uri(String),
}

/// A clickable area, `rect` given as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub rect: [f32; 4],
    pub target: LinkTarget,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
    pub links: Vec<Link>,
}

impl Page {
    /// All text on the page, one run per line.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Where a story's section begins.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionAnchor {
    pub title: String,
    /// Zero-based page index.
    pub page: usize,
    /// y coordinate of the top of the section.
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub title: String,
    pub pages: Vec<Page>,
    pub sections: Vec<SectionAnchor>,
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    font: Font,
    size: f32,
    color: Color,
    /// Line height as a multiple of `size`.
    leading: f32,
}

impl TextStyle {
    const fn new(font: Font, size: f32, color: Color, leading: f32) -> Self {
        Self {
            font,
            size,
            color,
            leading,
        }
    }

    fn line_height(&self) -> f32 {
        self.size * self.leading
    }
}

const BODY: TextStyle = TextStyle::new(Font::Regular, 10.5, INK, 1.5);
const COMMENT_BODY: TextStyle = TextStyle::new(Font::Regular, 9.5, INK, 1.45);
const COMMENT_META: TextStyle = TextStyle::new(Font::Regular, 8.0, MUTED, 1.4);
const SECTION_LABEL: TextStyle = TextStyle::new(Font::Bold, 11.0, ORANGE, 1.3);
const META: TextStyle = TextStyle::new(Font::Regular, 8.5, INK, 1.5);
const TOC_TITLE: TextStyle = TextStyle::new(Font::Bold, 10.0, HEADING, 1.3);
const TOC_META: TextStyle = TextStyle::new(Font::Regular, 7.5, MUTED, 1.4);

/// A TOC page number that can only be written once sections are placed.
#[derive(Debug)]
struct PendingPageNumber {
    page: usize,
    right: f32,
    baseline: f32,
    section: usize,
}

/// Cursor-based page builder. `y` is the top of the free space on the
/// current page and moves down as content is added.
#[derive(Debug)]
struct Composer {
    done: Vec<Page>,
    current: Page,
    y: f32,
    sections: Vec<SectionAnchor>,
    pending: Vec<PendingPageNumber>,
}

impl Composer {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Page::default(),
            y: PAGE_HEIGHT - MARGIN,
            sections: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn page_index(&self) -> usize {
        self.done.len()
    }

    fn is_page_blank(&self) -> bool {
        self.current.elements.is_empty()
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Break the page unless `height` still fits above the bottom margin.
    fn ensure(&mut self, height: f32) {
        if self.y - height < BOTTOM_LIMIT && !self.is_page_blank() {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text(&mut self, x: f32, baseline: f32, style: TextStyle, text: impl Into<String>) {
        self.current.elements.push(Element::Text {
            x,
            y: baseline,
            font: style.font,
            size: style.size,
            color: style.color,
            text: text.into(),
        });
    }

    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.current.elements.push(Element::Fill {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.current.elements.push(Element::Rule {
            from,
            to,
            width,
            color,
        });
    }

    fn link(&mut self, rect: [f32; 4], target: LinkTarget) {
        self.current.links.push(Link { rect, target });
    }

    /// Baseline for a line whose box starts at the cursor.
    fn baseline(&self, style: TextStyle) -> f32 {
        self.y - style.line_height() + (style.line_height() - style.size) / 2.0 + style.size * 0.22
    }

    /// Lay out one wrapped paragraph at `indent` from the left margin,
    /// optionally with an accent bar in the gutter beside every line.
    fn paragraph(&mut self, text: &str, style: TextStyle, indent: f32, bar: Option<Color>) {
        let width = CONTENT_WIDTH - indent;
        for line in wrap_text(text, style.font, style.size, width) {
            self.ensure(style.line_height());
            let baseline = self.baseline(style);
            if let Some(color) = bar {
                let x = MARGIN + 1.5;
                self.rule((x, self.y), (x, self.y - style.line_height()), 3.0, color);
            }
            self.text(MARGIN + indent, baseline, style, line);
            self.gap(style.line_height());
        }
    }

    /// A single line centred on the page.
    fn centered(&mut self, text: &str, style: TextStyle) {
        self.ensure(style.line_height());
        let width = text_width(text, style.font, style.size);
        let baseline = self.baseline(style);
        self.text((PAGE_WIDTH - width) / 2.0, baseline, style, text);
        self.gap(style.line_height());
    }

    /// Upper-case orange label with a rule underneath.
    fn section_label(&mut self, label: &str) {
        let needed = SECTION_LABEL.line_height() + 10.0 + BODY.line_height() * 2.0;
        self.ensure(needed);
        let baseline = self.baseline(SECTION_LABEL);
        self.text(MARGIN, baseline, SECTION_LABEL, label.to_uppercase());
        self.gap(SECTION_LABEL.line_height() + 2.0);
        self.rule((MARGIN, self.y), (PAGE_WIDTH - MARGIN, self.y), 2.0, ORANGE);
        self.gap(10.0);
    }

    fn finish(mut self) -> (Vec<Page>, Vec<SectionAnchor>, Vec<PendingPageNumber>) {
        if !self.is_page_blank() || self.done.is_empty() {
            self.done.push(self.current);
        }
        (self.done, self.sections, self.pending)
    }
}

/// Lay out the whole digest.
pub fn layout_digest(digest: &Digest) -> DocumentLayout {
    let mut composer = Composer::new();
    let entries = digest.entries();

    title_block(&mut composer, digest);
    for (index, entry) in entries.iter().enumerate() {
        toc_entry(&mut composer, index, entry);
    }

    for (index, entry) in entries.iter().enumerate() {
        composer.new_page();
        story_section(&mut composer, index, entries.len(), entry);
    }

    let (mut pages, sections, pending) = composer.finish();

    for number in pending {
        let Some(anchor) = sections.get(number.section) else {
            continue;
        };
        let label = (anchor.page + 1).to_string();
        let width = text_width(&label, TOC_TITLE.font, TOC_TITLE.size);
        if let Some(page) = pages.get_mut(number.page) {
            page.elements.push(Element::Text {
                x: number.right - width,
                y: number.baseline,
                font: TOC_TITLE.font,
                size: TOC_TITLE.size,
                color: MUTED,
                text: label,
            });
        }
    }

    let total = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", index + 1, total);
        let width = text_width(&label, Font::Regular, 8.0);
        page.elements.push(Element::Text {
            x: (PAGE_WIDTH - width) / 2.0,
            y: FOOTER_BASELINE,
            font: Font::Regular,
            size: 8.0,
            color: FOOTER,
            text: label,
        });
    }

    DocumentLayout {
        title: format!("{} - {}", DOCUMENT_TITLE, long_date(digest.date)),
        pages,
        sections,
    }
}

fn title_block(c: &mut Composer, digest: &Digest) {
    c.gap(30.0);
    c.centered(DOCUMENT_TITLE, TextStyle::new(Font::Bold, 28.0, HEADING, 1.2));
    c.gap(4.0);
    c.centered(
        &long_date(digest.date).to_uppercase(),
        TextStyle::new(Font::Bold, 11.0, ORANGE, 1.4),
    );
    c.gap(14.0);
    c.rule((MARGIN, c.y), (PAGE_WIDTH - MARGIN, c.y), 3.0, ORANGE);
    c.gap(20.0);
}

fn toc_entry(c: &mut Composer, index: usize, entry: &DigestEntry) {
    const BADGE_WIDTH: f32 = 20.0;
    const TITLE_INDENT: f32 = 30.0;
    const NUMBER_COLUMN: f32 = 30.0;
    const PADDING: f32 = 6.0;

    let story = &entry.story;
    let title_width = CONTENT_WIDTH - TITLE_INDENT - NUMBER_COLUMN - PADDING;
    let title_lines = wrap_text(&story.title, TOC_TITLE.font, TOC_TITLE.size, title_width);

    let mut meta = format!(
        "{} points · {} comments · by {}",
        story.points, story.num_comments, story.author
    );
    if let Some(domain) = story.domain() {
        meta.push_str(&format!(" · {domain}"));
    }

    let meta_lines = wrap_text(&meta, TOC_META.font, TOC_META.size, title_width);

    let height = PADDING * 2.0
        + title_lines.len() as f32 * TOC_TITLE.line_height()
        + meta_lines.len() as f32 * TOC_META.line_height();
    c.ensure(height + 4.0);

    let top = c.y;
    let bottom = top - height;
    let background = if index % 2 == 0 { STRIPE } else { PANEL };
    c.fill(MARGIN, bottom, CONTENT_WIDTH, height, background);
    c.gap(PADDING);

    let badge_baseline = c.baseline(TOC_TITLE);
    c.fill(
        MARGIN + PADDING,
        badge_baseline - 3.0,
        BADGE_WIDTH,
        TOC_TITLE.size + 3.0,
        ORANGE,
    );
    let rank = (index + 1).to_string();
    let rank_style = TextStyle::new(Font::Bold, 9.0, WHITE, 1.0);
    let rank_width = text_width(&rank, rank_style.font, rank_style.size);
    c.text(
        MARGIN + PADDING + (BADGE_WIDTH - rank_width) / 2.0,
        badge_baseline,
        rank_style,
        rank,
    );
    c.pending.push(PendingPageNumber {
        page: c.page_index(),
        right: PAGE_WIDTH - MARGIN - PADDING,
        baseline: badge_baseline,
        section: index,
    });

    for line in title_lines {
        let baseline = c.baseline(TOC_TITLE);
        c.text(MARGIN + TITLE_INDENT, baseline, TOC_TITLE, line);
        c.gap(TOC_TITLE.line_height());
    }
    for line in meta_lines {
        let baseline = c.baseline(TOC_META);
        c.text(MARGIN + TITLE_INDENT, baseline, TOC_META, line);
        c.gap(TOC_META.line_height());
    }

    c.link(
        [MARGIN, bottom, PAGE_WIDTH - MARGIN, top],
        LinkTarget::Section(index),
    );
    c.y = bottom - 4.0;
}

fn story_section(c: &mut Composer, index: usize, total: usize, entry: &DigestEntry) {
    let story = &entry.story;
    c.sections.push(SectionAnchor {
        title: format!("{}. {}", index + 1, story.title),
        page: c.page_index(),
        top: c.y,
    });

    // Header band
    let rank_style = TextStyle::new(Font::Bold, 8.0, Color(1.0, 0.85, 0.75), 1.6);
    let title_style = TextStyle::new(Font::Bold, 18.0, WHITE, 1.3);
    let title_lines = wrap_text(&story.title, title_style.font, title_style.size, CONTENT_WIDTH - 32.0);
    let band_height =
        28.0 + rank_style.line_height() + title_lines.len() as f32 * title_style.line_height();
    c.fill(MARGIN, c.y - band_height, CONTENT_WIDTH, band_height, ORANGE);
    c.gap(14.0);
    let baseline = c.baseline(rank_style);
    c.text(MARGIN + 16.0, baseline, rank_style, format!("#{} OF {}", index + 1, total));
    c.gap(rank_style.line_height());
    for line in title_lines {
        let baseline = c.baseline(title_style);
        c.text(MARGIN + 16.0, baseline, title_style, line);
        c.gap(title_style.line_height());
    }
    c.gap(14.0);

    // Metadata panel
    let stats = format!(
        "{} points · {} comments · by {} · {}",
        story.points,
        story.num_comments,
        story.author,
        story.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    let stats_lines = wrap_text(&stats, META.font, META.size, CONTENT_WIDTH - 32.0);
    let panel_height = 12.0 + META.line_height() * (stats_lines.len() + 1) as f32;
    c.fill(MARGIN, c.y - panel_height, CONTENT_WIDTH, panel_height, PANEL);
    c.gap(6.0);
    for line in stats_lines {
        let baseline = c.baseline(META);
        c.text(MARGIN + 16.0, baseline, META, line);
        c.gap(META.line_height());
    }

    let link_style = TextStyle { color: ORANGE, ..META };
    let baseline = c.baseline(META);
    let mut x = MARGIN + 16.0;
    x = linked_text(c, x, baseline, link_style, "View on HN", story.hn_url());
    if let Some(url) = &story.url {
        let separator = "  |  ";
        c.text(x, baseline, META, separator);
        x += text_width(separator, META.font, META.size);
        linked_text(c, x, baseline, link_style, &ellipsize(url, DISPLAY_URL_CHARS), url.clone());
    }
    c.gap(META.line_height() + 6.0);
    c.gap(20.0);

    // Article
    c.section_label("Article");
    let mut paragraphs = entry.article.paragraphs().peekable();
    if paragraphs.peek().is_none() {
        let style = TextStyle::new(Font::Italic, 10.5, MUTED, 1.5);
        c.ensure(style.line_height() + 24.0);
        c.gap(8.0);
        c.centered(ARTICLE_PLACEHOLDER, style);
        c.gap(8.0);
    } else {
        for paragraph in paragraphs {
            c.paragraph(paragraph, BODY, 0.0, None);
            c.gap(BODY.size * 0.6);
        }
    }

    if !entry.comments.is_empty() {
        c.gap(18.0);
        c.section_label(&format!("Top {} Comments", entry.comments.len()));
        for (position, comment) in entry.comments.iter().enumerate() {
            comment_block(c, position, comment);
        }
    }
}

/// Draw `label` as a link to `uri`, returning the x just past it.
fn linked_text(
    c: &mut Composer,
    x: f32,
    baseline: f32,
    style: TextStyle,
    label: &str,
    uri: String,
) -> f32 {
    let width = text_width(label, style.font, style.size);
    c.text(x, baseline, style, label);
    c.link(
        [x, baseline - 2.0, x + width, baseline + style.size],
        LinkTarget::Uri(uri),
    );
    x + width
}

fn comment_block(c: &mut Composer, position: usize, comment: &Comment) {
    const INDENT: f32 = 14.0;
    let bar = if position % 2 == 0 { ORANGE } else { LIGHT_ORANGE };

    let replies = match comment.reply_count {
        1 => "1 reply".to_string(),
        n => format!("{n} replies"),
    };
    let meta = format!(
        "{} · {} · {}",
        comment.author,
        comment.posted_at.format("%Y-%m-%d %H:%M UTC"),
        replies
    );

    c.ensure(COMMENT_META.line_height() + COMMENT_BODY.line_height() * 2.0);
    c.paragraph(&meta, COMMENT_META, INDENT, Some(bar));
    for paragraph in comment.text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        c.paragraph(paragraph, COMMENT_BODY, INDENT, Some(bar));
    }
    c.gap(12.0);
}
