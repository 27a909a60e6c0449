//! Error types for the pagesnip library.
//!
//! One enum covers every component failure. What distinguishes the variants
//! is not fatality but *recovery target*: the conversation controller maps
//! each variant to a user-facing message plus the next dialogue state the
//! user can retry from.
//!
//! * [`SnipError::CorruptDocument`]: re-prompt for a different source.
//! * [`SnipError::UnreachableUrl`] / [`SnipError::TransferError`] /
//!   [`SnipError::DownloadTooLarge`]: re-prompt for a different URL.
//! * [`SnipError::PageCopyError`]: re-prompt for a different range; the
//!   selected source stays valid.
//! * [`SnipError::NotFound`]: return to the stored-file listing.
//! * [`SnipError::OutputTooLarge`]: re-prompt for a smaller range.
//!
//! Anything that reaches the controller without a mapping falls through to
//! the catch-all boundary, which logs it and sends a truncated generic
//! message. A session must never end up silently unresponsive.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pagesnip library.
#[derive(Debug, Error)]
pub enum SnipError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The file could not be parsed as a PDF. Encrypted documents land here
    /// too: this service does not attempt any password flow.
    #[error("Cannot read '{}' as a PDF: {detail}", path.display())]
    CorruptDocument { path: PathBuf, detail: String },

    /// A single page could not be copied into the output document.
    /// Non-fatal for the session: the source stays selected and the user
    /// is asked for a different range.
    #[error("Failed to copy page {page}: {detail}")]
    PageCopyError { page: usize, detail: String },

    // ── Remote fetch errors ───────────────────────────────────────────────
    /// The URL probe got a non-2xx response or a network error.
    #[error("Cannot reach '{url}': {reason}")]
    UnreachableUrl { url: String, reason: String },

    /// Network or disk fault mid-download. The partial file must be
    /// discarded by the caller.
    #[error("Transfer from '{url}' failed: {reason}")]
    TransferError { url: String, reason: String },

    /// Streamed bytes would exceed the configured ceiling. Raised even when
    /// the advertised Content-Length under-reported the size.
    #[error("Download from '{url}' exceeds the {limit_bytes} byte limit")]
    DownloadTooLarge { url: String, limit_bytes: u64 },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A stored PDF named in a request is not on disk (e.g. it vanished
    /// between listing and selection).
    #[error("Stored PDF '{name}' not found")]
    NotFound { name: String },

    /// A suggested filename reduced to nothing after sanitisation.
    #[error("'{name}' is not a usable filename")]
    InvalidName { name: String },

    // ── Delivery errors ───────────────────────────────────────────────────
    /// Extraction output exceeds what the chat transport can deliver inline
    /// and no file server collaborator is configured.
    #[error("Output is {size_bytes} bytes, over the {limit_bytes} byte delivery limit")]
    OutputTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// The outbound chat channel rejected a send/edit call.
    #[error("Chat transport error: {detail}")]
    Transport { detail: String },

    // ── Ambient errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem fault outside the taxonomy above.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SnipError {
    /// True when the failure leaves the user's selected source intact and
    /// only the last step needs retrying.
    pub fn keeps_source(&self) -> bool {
        matches!(
            self,
            SnipError::PageCopyError { .. } | SnipError::OutputTooLarge { .. }
        )
    }
}
