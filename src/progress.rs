//! Progress-callback trait for long-running operations.
//!
//! Both the remote fetcher and the page extractor accept an
//! `Arc<dyn ProgressCallback>` and invoke it at checkpoints. The callback
//! approach keeps the components ignorant of how the host application talks
//! to its users: the controller forwards events into an in-place status
//! message, a test records them, a CLI could drive a progress bar.
//!
//! Checkpoint rates are bounded by the emitting component (every 5 % or
//! 10 s for downloads, every `max(1, total/10)` pages for extraction), so
//! implementations do not need their own throttling. They must tolerate
//! the outbound channel being transiently unavailable: log and continue,
//! never fail the operation over a progress update.

use std::sync::Arc;

/// Called by the fetcher and extractor as work advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: extraction
/// checkpoints fire from a `spawn_blocking` thread.
pub trait ProgressCallback: Send + Sync {
    /// A download checkpoint. `total_bytes` is `None` when the server did
    /// not advertise a Content-Length.
    fn on_download_progress(&self, bytes_written: u64, total_bytes: Option<u64>) {
        let _ = (bytes_written, total_bytes);
    }

    /// An extraction checkpoint: `pages_done` of `total_pages` copied so far.
    fn on_extract_progress(&self, pages_done: usize, total_pages: usize) {
        let _ = (pages_done, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared-callback type the components take.
pub type Progress = Arc<dyn ProgressCallback>;
