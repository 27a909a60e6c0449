//! Per-chat conversation state.
//!
//! The store is an explicit, injected value rather than a global, so its
//! lifecycle is visible: created at process start, dropped at shutdown.
//! There is no persistence; a restart loses every session and users
//! restart their flow, which is accepted behaviour.
//!
//! Sessions for different chats are fully independent. The mutex guards
//! only the map itself (the controller never holds it across an await),
//! because the concurrency contract is per-session serialisation of
//! events, provided by the event source, not by locking here.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Chat/session identifier as reported by the transport.
pub type ChatId = i64;

/// Where a session currently sits in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No flow in progress.
    #[default]
    Idle,
    /// Source menu offered; uploads are accepted here.
    AwaitingSource,
    /// Waiting for a free-text URL.
    AwaitingUrl,
    /// Probe succeeded; waiting for download confirmation.
    AwaitingUrlConfirmation,
    /// Stored-file keyboard offered.
    SelectingStored,
    /// Source analysed; waiting for a page range.
    AwaitingPageRange,
}

/// Conversation state for one chat.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    /// Selected source PDF on disk (storage-owned).
    pub source_path: Option<PathBuf>,
    /// Cached page count from the last successful analysis of `source_path`.
    pub page_count: Option<usize>,
    /// Validated-but-unconfirmed large range. Only ever set while in
    /// `AwaitingPageRange`; any transition out clears it.
    pending_range: Option<(usize, usize)>,
    /// URL captured during the confirmation flow.
    pub download_url: Option<String>,
    /// Filename derived for that URL.
    pub download_filename: Option<String>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`, maintaining the pending-range invariant.
    pub fn transition(&mut self, next: SessionState) {
        if self.state == SessionState::AwaitingPageRange && next != SessionState::AwaitingPageRange
        {
            self.pending_range = None;
        }
        self.state = next;
    }

    /// Record a successfully analysed source and enter the range prompt.
    pub fn select_source(&mut self, path: PathBuf, page_count: usize) {
        self.source_path = Some(path);
        self.page_count = Some(page_count);
        self.pending_range = None;
        self.transition(SessionState::AwaitingPageRange);
    }

    pub fn pending_range(&self) -> Option<(usize, usize)> {
        self.pending_range
    }

    /// Stash a validated large range awaiting its "yes".
    pub fn set_pending_range(&mut self, start: usize, end: usize) {
        debug_assert_eq!(self.state, SessionState::AwaitingPageRange);
        self.pending_range = Some((start, end));
    }

    /// Consume the pending range (confirmation, rejection, or replacement).
    pub fn take_pending_range(&mut self) -> Option<(usize, usize)> {
        self.pending_range.take()
    }

    /// Drop the URL-confirmation context.
    pub fn clear_download_context(&mut self) {
        self.download_url = None;
        self.download_filename = None;
    }
}

/// In-memory map from chat id to session. Cheap to clone and share.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ChatId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the session for `chat`, default (Idle) when none exists.
    pub fn snapshot(&self, chat: ChatId) -> Session {
        self.sessions
            .lock()
            .expect("session store poisoned")
            .get(&chat)
            .cloned()
            .unwrap_or_default()
    }

    /// Apply `f` to the session for `chat`, creating it if absent.
    pub fn update<R>(&self, chat: ChatId, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        f(sessions.entry(chat).or_default())
    }

    /// Forget the session entirely (conversation ended).
    pub fn end(&self, chat: ChatId) {
        self.sessions
            .lock()
            .expect("session store poisoned")
            .remove(&chat);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_idle() {
        let s = Session::default();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.source_path.is_none());
        assert!(s.pending_range().is_none());
    }

    #[test]
    fn leaving_range_state_clears_pending() {
        let mut s = Session::default();
        s.select_source(PathBuf::from("a.pdf"), 200);
        s.set_pending_range(1, 150);
        assert_eq!(s.pending_range(), Some((1, 150)));

        s.transition(SessionState::AwaitingSource);
        assert!(s.pending_range().is_none());
    }

    #[test]
    fn staying_in_range_state_keeps_pending() {
        let mut s = Session::default();
        s.select_source(PathBuf::from("a.pdf"), 200);
        s.set_pending_range(1, 150);
        s.transition(SessionState::AwaitingPageRange);
        assert_eq!(s.pending_range(), Some((1, 150)));
    }

    #[test]
    fn selecting_a_new_source_discards_pending() {
        let mut s = Session::default();
        s.select_source(PathBuf::from("a.pdf"), 200);
        s.set_pending_range(10, 180);
        s.select_source(PathBuf::from("b.pdf"), 5);
        assert!(s.pending_range().is_none());
        assert_eq!(s.page_count, Some(5));
    }

    #[test]
    fn store_isolates_chats() {
        let store = SessionStore::new();
        store.update(1, |s| s.transition(SessionState::AwaitingUrl));
        store.update(2, |s| s.transition(SessionState::AwaitingPageRange));

        assert_eq!(store.snapshot(1).state(), SessionState::AwaitingUrl);
        assert_eq!(store.snapshot(2).state(), SessionState::AwaitingPageRange);
        assert_eq!(store.snapshot(3).state(), SessionState::Idle);
    }

    #[test]
    fn end_forgets_the_session() {
        let store = SessionStore::new();
        store.update(7, |s| s.transition(SessionState::AwaitingSource));
        assert_eq!(store.len(), 1);
        store.end(7);
        assert_eq!(store.len(), 0);
        assert_eq!(store.snapshot(7).state(), SessionState::Idle);
    }
}
