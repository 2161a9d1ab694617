//! UI-agnostic conversation state types
//!
//! These mirror what the chat backend returns and are shared between the
//! session controller and any front-end rendering it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Title shown for a conversation until the backend assigns one.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Backend-assigned conversation identifier.
///
/// Opaque to the client and stable for the lifetime of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A server-tracked thread of messages, as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_title(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// A chat message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// System messages are kept by the backend but never rendered.
    pub fn is_visible(&self) -> bool {
        self.role != Role::System
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserializes_backend_roles() {
        let raw = r#"[{"role":"system","content":"ctx"},{"role":"user","content":"hi"}]"#;
        let messages: Vec<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages[0].role, Role::System);
        assert!(!messages[0].is_visible());
        assert_eq!(messages[1], Message::user("hi"));
    }

    #[test]
    fn test_conversation_id_is_transparent() {
        let id: ConversationId = serde_json::from_str("42").unwrap();
        assert_eq!(id, ConversationId(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_new_conversation_has_placeholder_title() {
        let convo = Conversation::new(ConversationId(1));
        assert_eq!(convo.title, DEFAULT_TITLE);
    }
}
