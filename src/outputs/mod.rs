//! Output generation for the digest document and the run log.
//!
//! # Submodules
//!
//! - [`fonts`]: Helvetica metrics, WinAnsi encoding and line wrapping
//! - [`layout`]: Turns a `Digest` into positioned pages, links and anchors
//! - [`pdf`]: Serialises the layout with `lopdf`
//! - [`runlog`]: One status line per run in `hn_digest.log`
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2026-10-16.pdf
//! ├── 2026-10-17.pdf
//! └── hn_digest.log
//! ```

pub mod fonts;
pub mod layout;
pub mod pdf;
pub mod runlog;

use crate::error::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Location of the digest for `date` inside `output_dir`.
pub fn digest_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{}.pdf", date.format("%Y-%m-%d")))
}

/// Write `bytes` to `path` through a temporary sibling file and a rename, so
/// readers never observe a half-written document.
#[instrument(level = "info", skip(bytes), fields(path = %path.display(), bytes = bytes.len()))]
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = path.with_extension("pdf.partial");
    if let Err(e) = fs::write(&partial, bytes).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&partial, path).await {
        warn!(error = %e, "Rename into place failed; removing partial file");
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }
    info!("Wrote digest");
    Ok(())
}
