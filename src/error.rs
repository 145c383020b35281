//! Error type shared by every stage of the digest pipeline.
//!
//! Only failures that abort a run travel as [`DigestError`]. Per-story
//! enrichment problems (a dead article link, a comment thread that will not
//! load) are logged where they happen and degrade to placeholders instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream API answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// An upstream payload did not match the expected JSON shape.
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialising the laid-out digest into PDF objects failed.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
