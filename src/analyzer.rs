//! PDF analysis: page count and parse validation.
//!
//! ## Why spawn_blocking?
//!
//! lopdf parses the whole cross-reference table synchronously; on a
//! multi-hundred-megabyte document that is a multi-second CPU-bound job.
//! `tokio::task::spawn_blocking` keeps it off the async workers so other
//! sessions stay responsive (the per-session serialisation contract is the
//! controller's, not the runtime's).
//!
//! Encrypted documents are deliberately reported as
//! [`SnipError::CorruptDocument`]: there is no password flow in this
//! service, so "encrypted" and "unparsable" are the same answer for the
//! user: pick a different source.

use crate::error::SnipError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Count the pages of the PDF at `path` without mutating it.
///
/// # Errors
/// [`SnipError::CorruptDocument`] when the file cannot be parsed as a PDF,
/// is encrypted, or has an empty page tree.
pub async fn page_count(path: &Path) -> Result<usize, SnipError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || page_count_blocking(&path))
        .await
        .map_err(|e| SnipError::Internal(format!("analysis task panicked: {e}")))?
}

/// Blocking implementation of page counting.
fn page_count_blocking(path: &Path) -> Result<usize, SnipError> {
    let doc = Document::load(path).map_err(|e| SnipError::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(SnipError::CorruptDocument {
            path: path.to_path_buf(),
            detail: "document is encrypted".into(),
        });
    }

    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(SnipError::CorruptDocument {
            path: path.to_path_buf(),
            detail: "document has no pages".into(),
        });
    }

    debug!("Analyzed {}: {} pages", path.display(), pages);
    Ok(pages)
}
