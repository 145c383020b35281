//! Turning web pages and HN comment HTML into plain text.
//!
//! # Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`article`] | Fetches a story's linked page and extracts its readable text |
//! | [`text`] | HTML-to-paragraph conversion shared with comment rendering |
//!
//! Fetch failures are never fatal here: they are logged and the story is
//! rendered with a placeholder instead of its article.

pub mod article;
pub mod text;
