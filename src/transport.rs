//! External-collaborator contracts: the chat transport and the static
//! file server, plus the inbound event model.
//!
//! The transport is consumed, never specified: this crate sends text,
//! edits text in place, shows button sets, and attaches files with a
//! caption. How those map onto a concrete chat platform lives outside.
//!
//! Button presses cross the boundary as an opaque string on most chat
//! platforms. [`Intent`] decodes that string exactly once, at the edge,
//! into a closed set of variants the controller matches exhaustively;
//! no stringly-typed dispatch survives past this module.

use crate::error::SnipError;
use crate::session::ChatId;
use async_trait::async_trait;
use std::path::Path;

/// Identifier of a sent message, used for in-place edits.
pub type MessageId = i64;

/// What the user asked for by pressing a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Provide the source by uploading a file.
    SelectUpload,
    /// Provide the source by URL.
    SelectUrl,
    /// Pick the source from the stored set.
    SelectLocal,
    /// Pick one specific stored file.
    SelectStoredFile(String),
    /// Go ahead with the probed download.
    ConfirmDownload,
    /// Abandon the probed download (also the "Exit" follow-up).
    CancelDownload,
    /// Return to the source menu.
    Back,
}

impl Intent {
    /// Wire encoding carried in the button payload.
    pub fn encode(&self) -> String {
        match self {
            Intent::SelectUpload => "upload".into(),
            Intent::SelectUrl => "url".into(),
            Intent::SelectLocal => "local".into(),
            Intent::SelectStoredFile(name) => format!("select_pdf:{name}"),
            Intent::ConfirmDownload => "confirm_download".into(),
            Intent::CancelDownload => "cancel_download".into(),
            Intent::Back => "back_to_start".into(),
        }
    }

    /// Decode a button payload. `None` for anything outside the closed set
    /// (stale keyboards from older builds, forged payloads).
    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "upload" => Some(Intent::SelectUpload),
            "url" => Some(Intent::SelectUrl),
            "local" => Some(Intent::SelectLocal),
            "confirm_download" => Some(Intent::ConfirmDownload),
            "cancel_download" => Some(Intent::CancelDownload),
            "back_to_start" => Some(Intent::Back),
            other => other
                .strip_prefix("select_pdf:")
                .filter(|name| !name.is_empty())
                .map(|name| Intent::SelectStoredFile(name.to_string())),
        }
    }
}

/// One button in an interactive set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub intent: Intent,
}

impl Button {
    pub fn new(label: impl Into<String>, intent: Intent) -> Self {
        Self {
            label: label.into(),
            intent,
        }
    }
}

/// Transport-reported metadata of an inbound file, available before any
/// byte of content is transferred.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Opaque handle the transport resolves in `fetch_attachment`.
    pub id: String,
    pub file_name: Option<String>,
    pub size_bytes: u64,
}

/// One inbound event for one chat.
#[derive(Debug, Clone)]
pub enum Event {
    /// A slash-command, name without the slash, plus its arguments.
    Command { name: String, args: Vec<String> },
    /// Free text.
    Text(String),
    /// A decoded button press.
    Button(Intent),
    /// An inbound file.
    Document(Attachment),
}

/// Outbound chat operations the controller needs.
///
/// Implementations enforce their own delivery ceilings and timeouts; the
/// controller treats the inline ceiling as [`crate::config::ServiceConfig::delivery_limit_bytes`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message, returning its id for later edits.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, SnipError>;

    /// Replace the text of an earlier message in place.
    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), SnipError>;

    /// Send a message with a button set attached.
    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<MessageId, SnipError>;

    /// Replace an earlier message with new text and a button set.
    async fn edit_menu(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), SnipError>;

    /// Send a file attachment with a caption.
    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), SnipError>;

    /// Resolve an inbound attachment to bytes on disk at `dest`.
    async fn fetch_attachment(&self, attachment: &Attachment, dest: &Path)
        -> Result<(), SnipError>;
}

/// Collaborator that turns a local file into a time-bounded public URL,
/// for outputs the transport cannot deliver inline.
///
/// The path is only valid for the duration of the call: extraction
/// outputs are deleted right after delivery, so implementations must copy
/// (or hard-link) the file before returning.
#[async_trait]
pub trait FileServer: Send + Sync {
    async fn publish(&self, path: &Path, filename: &str) -> Result<String, SnipError>;
}
