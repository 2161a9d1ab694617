//! Conversation session controller.
//!
//! A [`ChatSession`] owns the active conversation, the rendered transcript and
//! the `Idle`/`Sending` state machine. All state sits behind one mutex that is
//! never held across an `.await`: every transition is applied (and reported to
//! the observer) in a single critical section between suspension points.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::backend::ChatBackend;
use crate::error::Result;
use crate::ingest::{ingest, IngestOutcome, IngestSink, StreamState};
use crate::observer::{Confirm, SessionObserver};
use crate::state::{Conversation, ConversationId, Message};
use crate::transcript::{MessageRef, Transcript};

pub const DELETE_PROMPT: &str = "Delete this conversation?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A send is in flight. At most one exists per session.
    Sending,
}

/// Why a `send` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoActiveConversation,
    AlreadySending,
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// Transport failure; the reply shows the failure notice.
    Failed,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

struct Inner {
    state: SessionState,
    active: Option<ConversationId>,
    /// Sidebar order: most recently created first.
    conversations: Vec<Conversation>,
    transcript: Transcript,
    input_enabled: bool,
}

pub struct ChatSession<B, O> {
    backend: B,
    observer: O,
    confirm: Box<dyn Confirm>,
    inner: Mutex<Inner>,
}

impl<B: ChatBackend, O: SessionObserver> ChatSession<B, O> {
    pub fn new(backend: B, observer: O, confirm: impl Confirm + 'static) -> Self {
        Self {
            backend,
            observer,
            confirm: Box::new(confirm),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                active: None,
                conversations: Vec::new(),
                transcript: Transcript::new(),
                input_enabled: false,
            }),
        }
    }

    /// Seed the sidebar with conversations that already exist on the backend.
    pub fn with_conversations(mut self, conversations: Vec<Conversation>) -> Self {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.conversations = conversations;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.lock().active
    }

    pub fn input_enabled(&self) -> bool {
        self.lock().input_enabled
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.messages().to_vec()
    }

    pub async fn create_conversation(&self) -> Result<ConversationId> {
        let id = self.backend.create_conversation().await?;

        let mut inner = self.lock();
        let conversation = Conversation::new(id);
        inner.conversations.insert(0, conversation.clone());
        self.observer.conversation_added(&conversation);

        inner.active = Some(id);
        self.observer.active_changed(Some(id));

        inner.transcript.clear();
        self.observer.transcript_reset(&[]);

        self.set_input_enabled(&mut inner, true);
        info!(conversation = %id, "conversation created");
        Ok(id)
    }

    /// Make `id` active and load its history into the transcript.
    ///
    /// If another selection happens while the history is loading, the later
    /// selection wins and this history (or its load error) is discarded.
    pub async fn select_conversation(&self, id: ConversationId) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state == SessionState::Sending {
                warn!(conversation = %id, "switching conversation while a reply is streaming");
            }
            inner.active = Some(id);
            self.observer.active_changed(Some(id));
        }

        let history = self.backend.list_messages(id).await;

        let mut inner = self.lock();
        if inner.active != Some(id) {
            match history {
                Ok(_) => debug!(conversation = %id, "selection changed while loading history"),
                Err(err) => {
                    debug!(conversation = %id, error = %err, "discarding failed load of superseded selection")
                }
            }
            return Ok(());
        }
        match history {
            Ok(history) => {
                inner.transcript.replace(history);
                self.observer.transcript_reset(inner.transcript.messages());
                self.set_input_enabled(&mut inner, true);
                info!(
                    conversation = %id,
                    messages = inner.transcript.len(),
                    "conversation loaded"
                );
                Ok(())
            }
            Err(err) => {
                inner.transcript.clear();
                self.observer.transcript_reset(&[]);
                Err(err)
            }
        }
    }

    /// Send `text` to the active conversation and stream the reply into the
    /// transcript. Returns once the reply stream has ended.
    ///
    /// Silently skipped when nothing is active, a send is already in flight,
    /// or the trimmed text is empty.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let message = text.trim();

        let (id, placeholder) = {
            let mut inner = self.lock();
            let Some(id) = inner.active else {
                return SendOutcome::Skipped(SkipReason::NoActiveConversation);
            };
            if inner.state == SessionState::Sending {
                debug!(conversation = %id, "send ignored, reply already streaming");
                return SendOutcome::Skipped(SkipReason::AlreadySending);
            }
            if message.is_empty() {
                return SendOutcome::Skipped(SkipReason::EmptyMessage);
            }

            let user = inner.transcript.push(Message::user(message));
            self.notify_appended(&inner, user);
            let placeholder = inner.transcript.push(Message::assistant(""));
            self.notify_appended(&inner, placeholder);

            inner.state = SessionState::Sending;
            self.set_input_enabled(&mut inner, false);
            (id, placeholder)
        };

        info!(conversation = %id, chars = message.chars().count(), "sending message");
        let stream_state = StreamState::new(id, placeholder);
        let mut sink = SessionSink { session: self };
        let outcome = match self.backend.send_message(id, message).await {
            Ok(body) => ingest(body, stream_state, &mut sink).await,
            Err(err) => {
                warn!(conversation = %id, error = %err, "send request failed");
                stream_state.fail(&mut sink);
                IngestOutcome::Failed
            }
        };

        let mut inner = self.lock();
        inner.state = SessionState::Idle;
        let enabled = inner.active.is_some();
        self.set_input_enabled(&mut inner, enabled);

        match outcome {
            IngestOutcome::Completed { text } => {
                debug!(conversation = %id, reply_chars = text.chars().count(), "reply complete");
                SendOutcome::Completed
            }
            IngestOutcome::Failed => SendOutcome::Failed,
        }
    }

    /// Ask for confirmation, then delete `id` on the backend and drop it from
    /// the sidebar. Deleting the active conversation also clears the
    /// transcript and disables input.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<DeleteOutcome> {
        if !self.confirm.confirm(DELETE_PROMPT).await {
            debug!(conversation = %id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.backend.delete_conversation(id).await?;

        let mut inner = self.lock();
        let before = inner.conversations.len();
        inner.conversations.retain(|c| c.id != id);
        if inner.conversations.len() != before {
            self.observer.conversation_removed(id);
        }

        if inner.active == Some(id) {
            inner.active = None;
            self.observer.active_changed(None);
            inner.transcript.clear();
            self.observer.transcript_reset(&[]);
            self.set_input_enabled(&mut inner, false);
        }
        info!(conversation = %id, "conversation deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Whether the backend reports its model as reachable. A failed probe
    /// counts as unavailable.
    pub async fn probe_llm(&self) -> bool {
        match self.backend.llm_status().await {
            Ok(available) => available,
            Err(err) => {
                warn!(error = %err, "llm status probe failed");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_appended(&self, inner: &Inner, handle: MessageRef) {
        if let Some(message) = inner.transcript.get(handle) {
            self.observer.message_appended(handle.index, message);
        }
    }

    fn set_input_enabled(&self, inner: &mut Inner, enabled: bool) {
        if inner.input_enabled != enabled {
            inner.input_enabled = enabled;
            self.observer.input_enabled_changed(enabled);
        }
    }
}

/// Applies ingestion effects to the session under its lock.
struct SessionSink<'a, B, O> {
    session: &'a ChatSession<B, O>,
}

impl<B: ChatBackend, O: SessionObserver> IngestSink for SessionSink<'_, B, O> {
    fn update_placeholder(&mut self, placeholder: MessageRef, content: &str) {
        let mut inner = self.session.lock();
        match inner.transcript.set_content(placeholder, content) {
            Some(message) => self.session.observer.message_updated(placeholder.index, message),
            None => debug!("reply target no longer in transcript"),
        }
    }

    fn set_title(&mut self, conversation: ConversationId, title: &str) {
        let mut inner = self.session.lock();
        if let Some(entry) = inner.conversations.iter_mut().find(|c| c.id == conversation) {
            entry.title = title.to_string();
        }
        self.session.observer.title_changed(conversation, title);
    }

    fn scroll_to_bottom(&mut self) {
        self.session.observer.scroll_to_bottom();
    }
}
