//! View-side capabilities the session controller talks to.
//!
//! The core never renders anything itself; it reports changes through
//! [`SessionObserver`] and asks for destructive-action consent through
//! [`Confirm`].

use async_trait::async_trait;

use crate::state::{Conversation, ConversationId, Message};

/// Receives every change the controller makes to view-visible state.
///
/// Callbacks run synchronously while the session applies the change and must
/// not call back into the session.
pub trait SessionObserver: Send + Sync {
    fn message_appended(&self, index: usize, message: &Message);

    fn message_updated(&self, index: usize, message: &Message);

    fn title_changed(&self, id: ConversationId, title: &str);

    fn input_enabled_changed(&self, enabled: bool);

    /// The whole transcript was cleared or replaced by a loaded history.
    fn transcript_reset(&self, _messages: &[Message]) {}

    /// A streamed token arrived; the view should follow the newest content.
    fn scroll_to_bottom(&self) {}

    fn conversation_added(&self, _conversation: &Conversation) {}

    fn conversation_removed(&self, _id: ConversationId) {}

    fn active_changed(&self, _active: Option<ConversationId>) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn message_appended(&self, _index: usize, _message: &Message) {}
    fn message_updated(&self, _index: usize, _message: &Message) {}
    fn title_changed(&self, _id: ConversationId, _title: &str) {}
    fn input_enabled_changed(&self, _enabled: bool) {}
}

/// Interactive consent for destructive operations.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

#[async_trait]
impl<T: Confirm + ?Sized> Confirm for Box<T> {
    async fn confirm(&self, prompt: &str) -> bool {
        (**self).confirm(prompt).await
    }
}

/// Consent that is always given, for non-interactive use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

#[async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
