use crate::models::message::{Message, Role};

/// Ordered, append-only chat history for a single session.
///
/// Messages are only ever appended or dropped wholesale by `clear`.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns a copy of what was stored.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Message {
        let message = Message::new(role, content);
        self.messages.push(message.clone());
        message
    }

    /// All messages in chronological order. Borrowing keeps this non-destructive and
    /// restartable.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
