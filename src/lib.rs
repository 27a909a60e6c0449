//! # pagesnip
//!
//! A dialogue-driven PDF page-extraction service: users hand over a PDF
//! (upload, direct download URL, or a file already stored on the server),
//! name a page range, and get back a new PDF containing exactly those pages.
//!
//! ## Why a conversation?
//!
//! The service front-ends chat platforms, where a request arrives one
//! fragment at a time: first the file, then the range, with detours for
//! confirmations and corrections. Each chat therefore carries a small state
//! machine ([`session::Session`]) that remembers what has been established
//! so far, and the [`Controller`] advances it one inbound event at a time.
//!
//! ## Flow Overview
//!
//! ```text
//! Event (command / text / button / document)
//!  │
//!  ├─ 1. Source    upload, URL probe + confirmed download, or stored pick
//!  ├─ 2. Analyze   open the PDF, count pages (CPU-bound, spawn_blocking)
//!  ├─ 3. Range     parse `start-end`, validate against the page count
//!  ├─ 4. Extract   copy the pages into a fresh temp PDF, with progress
//!  └─ 5. Deliver   send inline, or publish via a FileServer when too big
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesnip::{Controller, Event, ServiceConfig};
//! use std::sync::Arc;
//!
//! # fn make_transport() -> Arc<dyn pagesnip::ChatTransport> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .storage_dir("/var/lib/pagesnip/pdfs")
//!         .build()?;
//!     let transport = make_transport(); // your chat platform adapter
//!     let controller = Controller::new(config, transport)?;
//!
//!     // Feed it events from your platform's update loop:
//!     controller
//!         .handle_event(42, Event::Command { name: "start".into(), args: vec![] })
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! The crate ships no transport binding of its own. Implement
//! [`ChatTransport`] (and optionally [`FileServer`] for oversized outputs)
//! against your platform and hand events to the controller.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyzer;
pub mod config;
pub mod controller;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod progress;
pub mod session;
pub mod storage;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ServiceConfig, ServiceConfigBuilder, DELIVERY_CEILING, DOWNLOAD_CEILING,
    LARGE_RANGE_THRESHOLD,
};
pub use controller::Controller;
pub use error::SnipError;
pub use extractor::ExtractionOutput;
pub use fetcher::{Fetcher, RemoteFile};
pub use progress::{NoopProgressCallback, Progress, ProgressCallback};
pub use session::{ChatId, Session, SessionState, SessionStore};
pub use storage::{ClearOutcome, Storage, StoredPdf};
pub use transport::{
    Attachment, Button, ChatTransport, Event, FileServer, Intent, MessageId,
};
