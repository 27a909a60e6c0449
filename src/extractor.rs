//! Page extraction: copy an inclusive 1-indexed page range into a fresh
//! temporary document.
//!
//! ## Why temp output?
//!
//! Extraction output is ephemeral by contract: produced for one delivery
//! and never added to the stored set. Returning a [`tempfile::TempPath`]
//! makes the cleanup automatic: the file is deleted when the handle drops,
//! whether delivery succeeded, failed, or panicked.
//!
//! ## Why spawn_blocking?
//!
//! Like analysis, lopdf's load/save cycle is CPU-bound and synchronous.
//! The extraction loop also fires progress checkpoints from the blocking
//! thread, which is why [`ProgressCallback`] is `Send + Sync`.

use crate::error::SnipError;
use crate::progress::Progress;
use lopdf::Document;
use std::path::Path;
use tracing::info;

/// The result of one extraction request.
///
/// `path` deletes the underlying file on drop; callers hold it until
/// delivery is finished and then simply let it go out of scope.
#[derive(Debug)]
pub struct ExtractionOutput {
    pub path: tempfile::TempPath,
    /// Pages in the output document, `end - start + 1`.
    pub page_count: usize,
    /// Size on disk; the caller enforces the delivery ceiling against it.
    pub size_bytes: u64,
}

/// Extract pages `[start, end]` (1-indexed, inclusive) from `source` into
/// a new temporary PDF, preserving original order and fidelity.
///
/// The caller has already validated `1 <= start <= end <= page_count`.
/// Checkpoints fire on `progress` every `max(1, total/10)` pages, so at
/// most ~10 updates regardless of range size.
///
/// # Errors
/// * [`SnipError::CorruptDocument`] when the source no longer parses.
/// * [`SnipError::PageCopyError`] naming the first page whose object
///   cannot be copied; the partial output is discarded.
pub async fn extract(
    source: &Path,
    start: usize,
    end: usize,
    progress: Progress,
) -> Result<ExtractionOutput, SnipError> {
    debug_assert!(1 <= start && start <= end);
    let source = source.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&source, start, end, progress))
        .await
        .map_err(|e| SnipError::Internal(format!("extraction task panicked: {e}")))?
}

/// Blocking implementation of range extraction.
fn extract_blocking(
    source: &Path,
    start: usize,
    end: usize,
    progress: Progress,
) -> Result<ExtractionOutput, SnipError> {
    let mut doc = Document::load(source).map_err(|e| SnipError::CorruptDocument {
        path: source.to_path_buf(),
        detail: e.to_string(),
    })?;

    let pages = doc.get_pages();
    let total_in_doc = pages.len();
    if end > total_in_doc || start < 1 {
        return Err(SnipError::Internal(format!(
            "range {start}-{end} not validated against {total_in_doc} pages"
        )));
    }

    let total = end - start + 1;
    let interval = (total / 10).max(1);

    // Walk the selected pages before touching the tree: a page whose
    // object is missing or malformed surfaces as PageCopyError naming the
    // page, and the output is never written.
    for (i, page_num) in (start..=end).enumerate() {
        let object_id = pages
            .get(&(page_num as u32))
            .copied()
            .ok_or_else(|| SnipError::PageCopyError {
                page: page_num,
                detail: "page missing from page tree".into(),
            })?;
        doc.get_object(object_id)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| SnipError::PageCopyError {
                page: page_num,
                detail: e.to_string(),
            })?;

        if i > 0 && i % interval == 0 {
            progress.on_extract_progress(i, total);
        }
    }

    // Keeping the range means deleting its complement; lopdf patches the
    // page tree and counts for us.
    let to_remove: Vec<u32> = (1..start as u32)
        .chain((end as u32 + 1)..=(total_in_doc as u32))
        .collect();
    if !to_remove.is_empty() {
        doc.delete_pages(&to_remove);
    }
    doc.prune_objects();
    doc.renumber_objects();

    let tmp = tempfile::Builder::new()
        .prefix("pagesnip_")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| SnipError::Internal(format!("temp output: {e}")))?;
    let path = tmp.into_temp_path();

    doc.save(&path).map_err(|e| SnipError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;

    let size_bytes = std::fs::metadata(&path)
        .map_err(|e| SnipError::Io {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();

    progress.on_extract_progress(total, total);
    info!(
        "Extracted pages {start}-{end} of {} -> {} bytes",
        source.display(),
        size_bytes
    );

    Ok(ExtractionOutput {
        path,
        page_count: total,
        size_bytes,
    })
}
