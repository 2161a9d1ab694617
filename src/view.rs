//! Bridges the session's observer callbacks onto the TUI event channel.

use async_trait::async_trait;
use hubchat_core::{Confirm, Conversation, ConversationId, Message, SessionObserver};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::tui::AppEvent;

#[derive(Debug)]
pub enum ViewEvent {
    MessageAppended(usize, Message),
    MessageUpdated(usize, Message),
    TranscriptReset(Vec<Message>),
    TitleChanged(ConversationId, String),
    InputEnabled(bool),
    ScrollToBottom,
    ConversationAdded(Conversation),
    ConversationRemoved(ConversationId),
    ActiveChanged(Option<ConversationId>),
    Confirm(String, oneshot::Sender<bool>),
    LlmStatus(bool),
    Flash(String),
}

#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: ViewEvent) {
        // The receiver only goes away on shutdown.
        let _ = self.tx.send(AppEvent::View(event));
    }
}

impl SessionObserver for ChannelObserver {
    fn message_appended(&self, index: usize, message: &Message) {
        self.emit(ViewEvent::MessageAppended(index, message.clone()));
    }

    fn message_updated(&self, index: usize, message: &Message) {
        self.emit(ViewEvent::MessageUpdated(index, message.clone()));
    }

    fn title_changed(&self, id: ConversationId, title: &str) {
        self.emit(ViewEvent::TitleChanged(id, title.to_string()));
    }

    fn input_enabled_changed(&self, enabled: bool) {
        self.emit(ViewEvent::InputEnabled(enabled));
    }

    fn transcript_reset(&self, messages: &[Message]) {
        self.emit(ViewEvent::TranscriptReset(messages.to_vec()));
    }

    fn scroll_to_bottom(&self) {
        self.emit(ViewEvent::ScrollToBottom);
    }

    fn conversation_added(&self, conversation: &Conversation) {
        self.emit(ViewEvent::ConversationAdded(conversation.clone()));
    }

    fn conversation_removed(&self, id: ConversationId) {
        self.emit(ViewEvent::ConversationRemoved(id));
    }

    fn active_changed(&self, active: Option<ConversationId>) {
        self.emit(ViewEvent::ActiveChanged(active));
    }
}

/// Asks the user through a y/n prompt rendered by the TUI.
pub struct PromptConfirm {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl PromptConfirm {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Confirm for PromptConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(AppEvent::View(ViewEvent::Confirm(prompt.to_string(), reply_tx)))
            .is_err()
        {
            warn!("confirmation requested after the UI shut down");
            return false;
        }
        // A dropped prompt counts as "no".
        reply_rx.await.unwrap_or(false)
    }
}
