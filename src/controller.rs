//! The conversation controller: the state machine that turns inbound chat
//! events into component calls and user-visible responses.
//!
//! ## Shape
//!
//! One inbound event for one chat is handled to completion before the next
//! (the event source serialises per chat), so every handler reads the
//! session, runs whatever I/O the transition needs, and writes the session
//! back. No lock is held across an await and no two handlers interleave
//! within a session.
//!
//! ## Error policy
//!
//! Every expected component failure is converted *inside the flow that hit
//! it* into a user-facing message plus a state the user can retry from: a
//! bad URL re-prompts for a URL, a corrupt download re-opens the source
//! menu, a failed page copy keeps the source selected and asks for another
//! range. Only genuinely unexpected errors bubble to [`Controller::handle_event`],
//! which logs them and sends one best-effort truncated notification. A
//! session must never hang silently, whatever went wrong.

use crate::analyzer;
use crate::config::ServiceConfig;
use crate::error::SnipError;
use crate::extractor;
use crate::fetcher::{self, Fetcher};
use crate::progress::{Progress, ProgressCallback};
use crate::session::{ChatId, SessionState, SessionStore};
use crate::storage::Storage;
use crate::transport::{Attachment, Button, ChatTransport, Event, FileServer, Intent, MessageId};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

const WELCOME: &str = "Welcome to the PDF page extractor! 📄✂️\n\nHow would you like to provide your PDF?";

const RANGE_PROMPT: &str = "Please specify which pages you want to extract in the format: start-end\nFor example: 1-5 (to extract pages 1 through 5)";

const CANCELLED: &str = "Operation cancelled. Send /start to begin again.";

/// How many stored files fit on one selection keyboard.
const STORED_MENU_LIMIT: usize = 10;

/// Orchestrates the dialogue over injected collaborators.
pub struct Controller {
    config: ServiceConfig,
    transport: Arc<dyn ChatTransport>,
    file_server: Option<Arc<dyn FileServer>>,
    storage: Storage,
    sessions: SessionStore,
    fetcher: Fetcher,
}

impl Controller {
    pub fn new(
        config: ServiceConfig,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Self, SnipError> {
        let storage = Storage::new(&config.storage_dir)?;
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            config,
            transport,
            file_server: None,
            storage,
            sessions: SessionStore::new(),
            fetcher,
        })
    }

    /// Attach the collaborator used for outputs over the delivery ceiling.
    pub fn with_file_server(mut self, server: Arc<dyn FileServer>) -> Self {
        self.file_server = Some(server);
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Entry point: handle one inbound event, absorbing every error.
    ///
    /// This is the catch-all boundary of §“Error policy”: anything the
    /// flows did not map themselves is logged with context and answered
    /// with a generic truncated message.
    pub async fn handle_event(&self, chat: ChatId, event: Event) {
        if let Err(e) = self.dispatch(chat, event).await {
            error!("Unhandled error for chat {chat}: {e}");
            let lower = e.to_string().to_ascii_lowercase();
            let text = if lower.contains("too large") || lower.contains("too big") {
                format!(
                    "⚠️ This file is too large (over {}MB). I can only process files up to {}MB.\n\n\
                     You can try providing a direct download link instead. Send /start to begin again.",
                    mb(self.config.delivery_limit_bytes),
                    mb(self.config.delivery_limit_bytes)
                )
            } else if lower.contains("timed out") {
                "⚠️ The operation timed out. This might happen with large files or complex PDFs.\n\n\
                 Please try again with a smaller PDF or fewer pages. Send /start to begin again."
                    .to_string()
            } else {
                format!(
                    "Sorry, an error occurred: {}...\nPlease try again or send /start to restart.",
                    truncate(&e.to_string(), 100)
                )
            };
            if let Err(send_err) = self.transport.send_text(chat, &text).await {
                error!("Error while reporting an error to chat {chat}: {send_err}");
            }
        }
    }

    async fn dispatch(&self, chat: ChatId, event: Event) -> Result<(), SnipError> {
        match event {
            Event::Command { name, args } => match name.as_str() {
                "start" => self.cmd_start(chat).await,
                "cancel" => self.cmd_cancel(chat).await,
                "list_pdfs" => self.cmd_list(chat).await,
                "clear_pdfs" => self.cmd_clear(chat, &args).await,
                other => {
                    info!("Unknown command '/{other}' from chat {chat}");
                    self.transport
                        .send_text(chat, "Unknown command. Send /start to begin.")
                        .await?;
                    Ok(())
                }
            },
            Event::Button(intent) => self.on_button(chat, intent).await,
            Event::Document(att) => self.on_document(chat, att).await,
            Event::Text(text) => self.on_text(chat, &text).await,
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// `/start` works from any state (re-entry point).
    async fn cmd_start(&self, chat: ChatId) -> Result<(), SnipError> {
        let buttons = [
            Button::new("Upload PDF", Intent::SelectUpload),
            Button::new("Provide URL", Intent::SelectUrl),
            Button::new("Select from stored PDFs", Intent::SelectLocal),
        ];
        self.transport.send_menu(chat, WELCOME, &buttons).await?;
        self.sessions.update(chat, |s| {
            s.clear_download_context();
            s.transition(SessionState::AwaitingSource);
        });
        Ok(())
    }

    /// Global fallback that ends the conversation unconditionally.
    async fn cmd_cancel(&self, chat: ChatId) -> Result<(), SnipError> {
        self.sessions.end(chat);
        self.transport.send_text(chat, CANCELLED).await?;
        Ok(())
    }

    async fn cmd_list(&self, chat: ChatId) -> Result<(), SnipError> {
        let files = self.storage.list().await?;
        if files.is_empty() {
            self.transport
                .send_text(chat, "No PDF files are currently stored on the server.")
                .await?;
            return Ok(());
        }
        let mut message = String::from("Stored PDF files:\n\n");
        for (i, f) in files.iter().enumerate() {
            message.push_str(&format!("{}. {} ({})\n", i + 1, f.name, mb1(f.size_bytes)));
        }
        self.transport.send_text(chat, &message).await?;
        Ok(())
    }

    /// `/clear_pdfs` requires the literal `confirm` argument.
    async fn cmd_clear(&self, chat: ChatId, args: &[String]) -> Result<(), SnipError> {
        let confirmed = args
            .first()
            .map(|a| a.eq_ignore_ascii_case("confirm"))
            .unwrap_or(false);
        if !confirmed {
            self.transport
                .send_text(
                    chat,
                    "⚠️ This will delete ALL stored PDF files.\nTo confirm, use: /clear_pdfs confirm",
                )
                .await?;
            return Ok(());
        }

        let outcome = self.storage.clear_all().await?;
        let text = if outcome.deleted == 0 && outcome.failed == 0 {
            "No PDF files to delete.".to_string()
        } else if outcome.failed == 0 {
            format!("Deleted {} PDF files from storage.", outcome.deleted)
        } else {
            format!(
                "Deleted {} PDF files from storage ({} could not be deleted).",
                outcome.deleted, outcome.failed
            )
        };
        self.transport.send_text(chat, &text).await?;
        Ok(())
    }

    // ── Buttons ───────────────────────────────────────────────────────────

    async fn on_button(&self, chat: ChatId, intent: Intent) -> Result<(), SnipError> {
        match intent {
            Intent::SelectUpload => {
                self.transport
                    .send_text(
                        chat,
                        &format!(
                            "Please upload your PDF file.\n\nNote: I can only process files up to {}MB.",
                            mb(self.config.delivery_limit_bytes)
                        ),
                    )
                    .await?;
                self.sessions
                    .update(chat, |s| s.transition(SessionState::AwaitingSource));
                Ok(())
            }
            Intent::SelectUrl => {
                self.transport
                    .send_text(
                        chat,
                        &format!(
                            "Please send me a direct download link to your PDF file.\n\n\
                             Note: I can download files up to {}GB. The link must be a direct \
                             download link to a PDF file.",
                            self.config.download_limit_bytes / (1024 * 1024 * 1024)
                        ),
                    )
                    .await?;
                self.sessions
                    .update(chat, |s| s.transition(SessionState::AwaitingUrl));
                Ok(())
            }
            Intent::SelectLocal => self.show_stored_menu(chat).await,
            Intent::Back => self.cmd_start(chat).await,
            Intent::SelectStoredFile(name) => self.on_select_stored(chat, &name).await,
            Intent::ConfirmDownload => self.on_confirm_download(chat).await,
            Intent::CancelDownload => self.cmd_cancel(chat).await,
        }
    }

    /// Offer the stored-file keyboard; with nothing stored, fall back to
    /// the two remaining source intents instead of a dead end.
    async fn show_stored_menu(&self, chat: ChatId) -> Result<(), SnipError> {
        let files = self.storage.list().await?;
        if files.is_empty() {
            let buttons = [
                Button::new("Upload PDF", Intent::SelectUpload),
                Button::new("Provide URL", Intent::SelectUrl),
            ];
            self.transport
                .send_menu(
                    chat,
                    "No PDF files are currently stored on the server.\n\nPlease choose another option:",
                    &buttons,
                )
                .await?;
            self.sessions
                .update(chat, |s| s.transition(SessionState::AwaitingSource));
            return Ok(());
        }

        let mut buttons: Vec<Button> = files
            .iter()
            .take(STORED_MENU_LIMIT)
            .map(|f| {
                Button::new(
                    format!("{} ({})", f.name, mb1(f.size_bytes)),
                    Intent::SelectStoredFile(f.name.clone()),
                )
            })
            .collect();
        buttons.push(Button::new("Back", Intent::Back));

        self.transport
            .send_menu(chat, "Select a PDF file to split:", &buttons)
            .await?;
        self.sessions
            .update(chat, |s| s.transition(SessionState::SelectingStored));
        Ok(())
    }

    /// A stored file was picked; it may have vanished since listing.
    async fn on_select_stored(&self, chat: ChatId, name: &str) -> Result<(), SnipError> {
        let Ok(bare) = Storage::sanitize(name) else {
            return self.report_stale_selection(chat).await;
        };
        let path = self.storage.path_for(&bare);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return self.report_stale_selection(chat).await;
        }

        let status = self
            .transport
            .send_text(chat, "Analyzing the selected PDF...")
            .await?;
        match analyzer::page_count(&path).await {
            Ok(pages) => {
                self.sessions
                    .update(chat, |s| s.select_source(path.clone(), pages));
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "Selected PDF: {bare}\nNumber of pages: {pages}\n\n{RANGE_PROMPT}"
                        ),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => {
                warn!("Analysis of stored PDF '{bare}' failed: {e}");
                self.transport
                    .edit_text(
                        chat,
                        status,
                        "Sorry, there was an error processing this PDF. Please try another file.",
                    )
                    .await?;
                self.show_stored_menu(chat).await
            }
        }
    }

    async fn report_stale_selection(&self, chat: ChatId) -> Result<(), SnipError> {
        self.transport
            .send_text(
                chat,
                "Sorry, the selected file no longer exists. Please try another option.",
            )
            .await?;
        // Listing refreshed so the stale entry is gone.
        self.show_stored_menu(chat).await
    }

    /// Explicit accept of a probed URL: stream the download into storage,
    /// then analyse like any other source.
    async fn on_confirm_download(&self, chat: ChatId) -> Result<(), SnipError> {
        let session = self.sessions.snapshot(chat);
        let (Some(url), Some(filename)) = (
            session.download_url.clone(),
            session.download_filename.clone(),
        ) else {
            // Stale or missing confirmation context is fatal to this flow.
            warn!("Download confirmation without context for chat {chat}");
            self.sessions.end(chat);
            self.transport
                .send_text(chat, "Sorry, there was an issue. Please try again.")
                .await?;
            return Ok(());
        };

        let status = self
            .transport
            .send_text(
                chat,
                "Starting download... This might take a while for large files.",
            )
            .await?;

        let dest = self.storage.path_for(&Storage::sanitize(&filename)?);
        let progress = self.status_progress(chat, status);

        match self
            .fetcher
            .download(&url, &dest, self.config.download_limit_bytes, &*progress)
            .await
        {
            Ok(_) => {
                self.transport
                    .edit_text(chat, status, "Download complete. Analyzing PDF...")
                    .await?;
                match analyzer::page_count(&dest).await {
                    Ok(pages) => {
                        self.sessions.update(chat, |s| {
                            s.clear_download_context();
                            s.select_source(dest.clone(), pages);
                        });
                        self.transport
                            .edit_text(
                                chat,
                                status,
                                &format!(
                                    "PDF downloaded and processed successfully! It has {pages} pages.\n\n{RANGE_PROMPT}"
                                ),
                            )
                            .await?;
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Downloaded file failed analysis: {e}");
                        discard(&dest).await;
                        self.transport
                            .edit_text(
                                chat,
                                status,
                                "The downloaded file could not be read as a PDF. Please try a different source.",
                            )
                            .await?;
                        self.cmd_start(chat).await
                    }
                }
            }
            Err(e) => {
                warn!("Download failed for chat {chat}: {e}");
                discard(&dest).await;
                self.sessions.update(chat, |s| {
                    s.clear_download_context();
                    s.transition(SessionState::AwaitingUrl);
                });
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "Sorry, there was an error downloading the file.\n\nError: {}...\n\n\
                             Please check your link and send a different URL.",
                            truncate(&e.to_string(), 100)
                        ),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    // ── Uploads ───────────────────────────────────────────────────────────

    async fn on_document(&self, chat: ChatId, att: Attachment) -> Result<(), SnipError> {
        if self.sessions.snapshot(chat).state() != SessionState::AwaitingSource {
            self.transport
                .send_text(chat, "Send /start to begin.")
                .await?;
            return Ok(());
        }

        // Metadata-only gate: reject before a single byte is transferred.
        if att.size_bytes > self.config.delivery_limit_bytes {
            let limit = mb(self.config.delivery_limit_bytes);
            let buttons = [
                Button::new("Provide URL Instead", Intent::SelectUrl),
                Button::new("Try Another File", Intent::SelectUpload),
            ];
            self.transport
                .send_menu(
                    chat,
                    &format!(
                        "⚠️ This file is too large (over {limit}MB). I can only process files up to {limit}MB.\n\n\
                         You can provide a direct download link instead, or try a smaller file."
                    ),
                    &buttons,
                )
                .await?;
            return Ok(());
        }

        let status = self
            .transport
            .send_text(chat, "Downloading your PDF... Please wait.")
            .await?;

        let name = att
            .file_name
            .as_deref()
            .and_then(|n| Storage::sanitize(n).ok())
            .unwrap_or_else(|| format!("upload_{chat}.pdf"));
        let dest = self.storage.path_for(&name);

        if let Err(e) = self.transport.fetch_attachment(&att, &dest).await {
            warn!("Upload transfer failed for chat {chat}: {e}");
            discard(&dest).await;
            self.transport
                .edit_text(
                    chat,
                    status,
                    "Sorry, there was an error receiving your PDF. Please try again with a smaller file.",
                )
                .await?;
            return Ok(());
        }

        self.transport
            .edit_text(chat, status, "PDF downloaded. Analyzing file...")
            .await?;

        match analyzer::page_count(&dest).await {
            Ok(pages) => {
                self.sessions
                    .update(chat, |s| s.select_source(dest.clone(), pages));
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!("PDF received! It has {pages} pages.\n\n{RANGE_PROMPT}"),
                    )
                    .await?;
            }
            Err(e) => {
                warn!("Uploaded file failed analysis: {e}");
                discard(&dest).await;
                self.transport
                    .edit_text(
                        chat,
                        status,
                        "Sorry, there was an error processing your PDF. Please try another file.",
                    )
                    .await?;
            }
        }
        Ok(())
    }

    // ── Free text ─────────────────────────────────────────────────────────

    async fn on_text(&self, chat: ChatId, text: &str) -> Result<(), SnipError> {
        match self.sessions.snapshot(chat).state() {
            SessionState::AwaitingUrl => self.handle_url_text(chat, text.trim()).await,
            SessionState::AwaitingPageRange => self.handle_range_text(chat, text.trim()).await,
            _ => {
                self.transport
                    .send_text(chat, "Send /start to begin.")
                    .await?;
                Ok(())
            }
        }
    }

    /// Probe a submitted URL and, when it checks out, ask for download
    /// confirmation. Every rejection keeps the user in `AwaitingUrl`.
    async fn handle_url_text(&self, chat: ChatId, url: &str) -> Result<(), SnipError> {
        if !fetcher::is_http_url(url) {
            self.transport
                .send_text(
                    chat,
                    "Please provide a valid URL starting with http:// or https://",
                )
                .await?;
            return Ok(());
        }

        let status = self
            .transport
            .send_text(chat, "Checking the URL... Please wait.")
            .await?;

        let remote = match self.fetcher.probe(url).await {
            Ok(r) => r,
            Err(e) => {
                warn!("URL probe failed for chat {chat}: {e}");
                self.transport
                    .edit_text(
                        chat,
                        status,
                        "⚠️ Error accessing the URL. Please check if the link is correct and try again.",
                    )
                    .await?;
                return Ok(());
            }
        };

        if !remote.looks_like_pdf() {
            self.transport
                .edit_text(
                    chat,
                    status,
                    "⚠️ This URL doesn't seem to point to a PDF file.\n\
                     Please provide a direct download link to a PDF file.",
                )
                .await?;
            return Ok(());
        }

        if let Some(size) = remote.size_bytes {
            if size > self.config.download_limit_bytes {
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "⚠️ The file is too large ({}MB).\nI can only download files up to {}MB.",
                            mb(size),
                            mb(self.config.download_limit_bytes)
                        ),
                    )
                    .await?;
                return Ok(());
            }
        }

        let size_info = remote
            .size_bytes
            .map(|s| format!("{}MB", mb(s)))
            .unwrap_or_else(|| "Unknown size".to_string());
        let filename = remote.suggested_filename.clone();

        self.sessions.update(chat, |s| {
            s.download_url = Some(url.to_string());
            s.download_filename = Some(filename.clone());
            s.transition(SessionState::AwaitingUrlConfirmation);
        });

        let buttons = [
            Button::new("Yes, download it", Intent::ConfirmDownload),
            Button::new("No, cancel", Intent::CancelDownload),
        ];
        self.transport
            .edit_menu(
                chat,
                status,
                &format!(
                    "I found a file at this URL:\n\n📄 Name: {}\n📊 Size: {size_info}\n\n\
                     Would you like me to download and process this file?",
                    remote.suggested_filename
                ),
                &buttons,
            )
            .await?;
        Ok(())
    }

    /// Parse and validate a page-range reply, gate large ranges behind an
    /// explicit "yes", then run the extraction.
    async fn handle_range_text(&self, chat: ChatId, text: &str) -> Result<(), SnipError> {
        let session = self.sessions.snapshot(chat);
        let (Some(source), Some(num_pages)) = (session.source_path.clone(), session.page_count)
        else {
            // Range state without a source: stale beyond repair.
            self.sessions.end(chat);
            self.transport
                .send_text(chat, "Send /start to begin.")
                .await?;
            return Ok(());
        };

        let status = self
            .transport
            .send_text(chat, "Validating your request...")
            .await?;

        let pending = if text.eq_ignore_ascii_case("yes") {
            self.sessions.update(chat, |s| s.take_pending_range())
        } else {
            None
        };
        let (start, end) = if let Some(range) = pending {
            range
        } else {
            // Any reply other than the confirmation discards the pending
            // range and is parsed as a fresh request.
            self.sessions.update(chat, |s| {
                s.take_pending_range();
            });

            let Some((start, end)) = parse_page_range(text) else {
                self.transport
                    .edit_text(
                        chat,
                        status,
                        "Invalid format! Please enter either a single page number (e.g., 157) \
                         or a range in the format: start-end (e.g., 1-5)",
                    )
                    .await?;
                return Ok(());
            };

            if start < 1 || end > num_pages || start > end {
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "Invalid page range! The document has {num_pages} pages. \
                             Please specify a valid page or range between 1 and {num_pages}."
                        ),
                    )
                    .await?;
                return Ok(());
            }

            let span = end - start + 1;
            if span > self.config.large_range_threshold {
                self.sessions.update(chat, |s| s.set_pending_range(start, end));
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "⚠️ You asked for {span} pages (pages {start}-{end}). That's a large \
                             extraction.\n\nReply 'yes' to proceed, or send a different range."
                        ),
                    )
                    .await?;
                return Ok(());
            }

            (start, end)
        };

        self.run_extraction(chat, status, &source, start, end).await
    }

    // ── Extraction and delivery ───────────────────────────────────────────

    async fn run_extraction(
        &self,
        chat: ChatId,
        status: MessageId,
        source: &Path,
        start: usize,
        end: usize,
    ) -> Result<(), SnipError> {
        self.transport
            .edit_text(
                chat,
                status,
                "Creating your new PDF... This may take a moment.",
            )
            .await?;

        let progress = self.status_progress(chat, status);
        let output = match extractor::extract(source, start, end, progress).await {
            Ok(out) => out,
            Err(SnipError::PageCopyError { page, detail }) => {
                warn!("Page copy failed on page {page}: {detail}");
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!("Error processing page {page}. Please try a different range."),
                    )
                    .await?;
                return Ok(());
            }
            Err(SnipError::CorruptDocument { path, detail }) => {
                warn!("Source became unreadable during extraction: {detail}");
                self.sessions.update(chat, |s| {
                    s.source_path = None;
                    s.page_count = None;
                });
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "Sorry, '{}' could no longer be read. Please pick another source.",
                            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
                        ),
                    )
                    .await?;
                return self.cmd_start(chat).await;
            }
            Err(e) => return Err(e),
        };

        let output_filename = output_name(source, start, end);
        self.transport
            .edit_text(chat, status, "Finalizing your PDF...")
            .await?;

        if output.size_bytes <= self.config.delivery_limit_bytes {
            self.transport
                .edit_text(chat, status, "Sending your new PDF...")
                .await?;
            let caption = format!("Here's your new PDF with pages {start} to {end}.");
            if let Err(e) = self
                .transport
                .send_document(chat, &output.path, &output_filename, &caption)
                .await
            {
                warn!("Delivery failed for chat {chat}: {e}");
                self.transport
                    .edit_text(
                        chat,
                        status,
                        &format!(
                            "Sorry, the file could not be delivered: {}...\nPlease try again.",
                            truncate(&e.to_string(), 100)
                        ),
                    )
                    .await?;
                return Ok(());
            }
        } else if let Some(server) = &self.file_server {
            self.transport
                .edit_text(
                    chat,
                    status,
                    &format!(
                        "The resulting PDF is {}MB, which exceeds the {}MB inline limit. \
                         Preparing a download link for you...",
                        mb(output.size_bytes),
                        mb(self.config.delivery_limit_bytes)
                    ),
                )
                .await?;
            match server.publish(&output.path, &output_filename).await {
                Ok(url) => {
                    self.transport
                        .send_text(
                            chat,
                            &format!(
                                "Your PDF with pages {start} to {end} is ready!\n\nSize: {}MB\n\n\
                                 Download it here (the link is time-limited): {url}",
                                mb(output.size_bytes)
                            ),
                        )
                        .await?;
                }
                Err(e) => {
                    warn!("File server publish failed: {e}");
                    self.transport
                        .edit_text(
                            chat,
                            status,
                            "Sorry, the download link could not be prepared. Please try a smaller page range.",
                        )
                        .await?;
                    return Ok(());
                }
            }
        } else {
            self.transport
                .edit_text(
                    chat,
                    status,
                    &format!(
                        "The resulting PDF is {}MB, which exceeds the {}MB delivery limit. \
                         Please try a smaller page range.",
                        mb(output.size_bytes),
                        mb(self.config.delivery_limit_bytes)
                    ),
                )
                .await?;
            return Ok(());
        }

        // Output handle drops here; the temp file is gone after delivery.
        drop(output);

        let source_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let buttons = [
            Button::new("Split another PDF", Intent::Back),
            Button::new("Use same PDF", Intent::SelectStoredFile(source_name)),
            Button::new("Exit", Intent::CancelDownload),
        ];
        self.transport
            .send_menu(chat, "What would you like to do next?", &buttons)
            .await?;
        self.sessions
            .update(chat, |s| s.transition(SessionState::AwaitingSource));
        Ok(())
    }

    /// Progress callback that edits the status message in place. Edits are
    /// fire-and-forget: a failed update is logged, never fatal.
    fn status_progress(&self, chat: ChatId, message: MessageId) -> Progress {
        Arc::new(StatusProgress {
            transport: Arc::clone(&self.transport),
            chat,
            message,
            handle: tokio::runtime::Handle::current(),
        })
    }
}

/// Bridges sync progress checkpoints (some fire on blocking threads) onto
/// the async transport.
struct StatusProgress {
    transport: Arc<dyn ChatTransport>,
    chat: ChatId,
    message: MessageId,
    handle: tokio::runtime::Handle,
}

impl StatusProgress {
    fn spawn_edit(&self, text: String) {
        let transport = Arc::clone(&self.transport);
        let (chat, message) = (self.chat, self.message);
        self.handle.spawn(async move {
            if let Err(e) = transport.edit_text(chat, message, &text).await {
                warn!("Could not update progress message: {e}");
            }
        });
    }
}

impl ProgressCallback for StatusProgress {
    fn on_download_progress(&self, bytes_written: u64, total_bytes: Option<u64>) {
        let text = match total_bytes {
            Some(total) if total > 0 => format!(
                "Downloading: {:.1}% complete\n({:.1}MB of {:.1}MB)",
                bytes_written as f64 / total as f64 * 100.0,
                bytes_written as f64 / (1024.0 * 1024.0),
                total as f64 / (1024.0 * 1024.0)
            ),
            _ => format!(
                "Downloading: {:.1}MB so far (total size unknown)",
                bytes_written as f64 / (1024.0 * 1024.0)
            ),
        };
        self.spawn_edit(text);
    }

    fn on_extract_progress(&self, pages_done: usize, total_pages: usize) {
        if pages_done < total_pages {
            self.spawn_edit(format!(
                "Processing pages: {:.1}% complete ({pages_done}/{total_pages} pages)",
                pages_done as f64 / total_pages as f64 * 100.0
            ));
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

/// Parse `start-end` or a bare page number into an inclusive pair.
/// Bounds are validated separately against the analysed page count.
fn parse_page_range(text: &str) -> Option<(usize, usize)> {
    let text = text.trim();
    if let Some((a, b)) = text.split_once('-') {
        Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
    } else {
        let page = text.parse().ok()?;
        Some((page, page))
    }
}

/// `report.pdf` + 5..=12 -> `report_pages_5_to_12.pdf`.
fn output_name(source: &Path, start: usize, end: usize) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}_pages_{start}_to_{end}.pdf")
}

/// Whole mebibytes, for user-facing sizes.
fn mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

/// One-decimal mebibytes, for listings.
fn mb1(bytes: u64) -> String {
    format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Char-boundary-safe prefix for error surfacing.
fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Remove a partial or rejected file, ignoring absence.
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not discard {}: {e}", path.display());
        }
    }
}
