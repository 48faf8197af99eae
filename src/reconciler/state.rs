//! Generation state and the session transcript

use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Where a session is in its turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    /// Ready for user input
    #[default]
    Idle,
    /// Engine stream is being consumed
    Streaming,
    /// Stream finished, transcript being persisted
    Finalizing,
}

impl GenerationState {
    pub fn is_idle(self) -> bool {
        matches!(self, GenerationState::Idle)
    }
}

/// Ordered, de-duplicated messages shown to the user.
///
/// Append-only, except that the message currently being streamed is replaced
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
    streaming_index: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            streaming_index: None,
        }
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

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append the first snapshot of a streamed message
    pub fn begin_streaming(&mut self, message: Message) {
        self.streaming_index = Some(self.messages.len());
        self.messages.push(message);
    }

    /// Replace the streamed message with a newer snapshot, or its final form
    pub fn replace_streaming(&mut self, message: Message) {
        match self
            .streaming_index
            .and_then(|idx| self.messages.get_mut(idx))
        {
            Some(slot) => *slot = message,
            None => self.begin_streaming(message),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_index.is_some()
    }

    pub fn end_streaming(&mut self) {
        self.streaming_index = None;
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
