use crate::state::Message;

/// Stable handle to a message in the transcript.
///
/// Carries the generation it was issued in, so a handle taken before the
/// transcript was cleared or replaced no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub index: usize,
    generation: u64,
}

/// Ordered messages of the active conversation, as rendered.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    generation: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation += 1;
    }

    /// Replace the contents with a loaded history, dropping system messages.
    pub fn replace(&mut self, history: Vec<Message>) {
        self.messages = history.into_iter().filter(Message::is_visible).collect();
        self.generation += 1;
    }

    pub fn push(&mut self, message: Message) -> MessageRef {
        self.messages.push(message);
        MessageRef {
            index: self.messages.len() - 1,
            generation: self.generation,
        }
    }

    pub fn get(&self, handle: MessageRef) -> Option<&Message> {
        if handle.generation != self.generation {
            return None;
        }
        self.messages.get(handle.index)
    }

    /// Replace the content of a message. Returns the updated message, or `None`
    /// when the handle is stale.
    pub fn set_content(&mut self, handle: MessageRef, content: &str) -> Option<&Message> {
        if handle.generation != self.generation {
            return None;
        }
        let message = self.messages.get_mut(handle.index)?;
        message.content.clear();
        message.content.push_str(content);
        Some(message)
    }
}
