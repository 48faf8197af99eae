//! Partial message accumulation for the delta stream

use crate::message::{Message, MessageFragment, Role, ToolCall, ToolCallChunk};
use serde_json::Map;

/// Tool call still being streamed; arguments stay raw text until the turn is finalized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialToolCall {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub args_text: String,
}

impl PartialToolCall {
    fn from_chunk(chunk: ToolCallChunk) -> Self {
        Self {
            index: chunk.index,
            id: chunk.id,
            name: chunk.name,
            args_text: chunk.args,
        }
    }

    fn absorb(&mut self, chunk: ToolCallChunk) {
        if self.id.is_none() {
            self.id = chunk.id;
        }
        if self.name.is_none() {
            self.name = chunk.name;
        }
        self.args_text.push_str(&chunk.args);
    }

    /// Snapshot view. Arguments stay empty until the step completes with
    /// the finalized call.
    fn snapshot(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            args: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Partial {
    content: String,
    tool_calls: Vec<PartialToolCall>,
}

impl Partial {
    fn absorb(&mut self, fragment: MessageFragment) {
        self.content.push_str(&fragment.content);
        for chunk in fragment.tool_call_chunks {
            match self.tool_calls.iter_mut().find(|c| c.index == chunk.index) {
                Some(existing) => existing.absorb(chunk),
                None => self.tool_calls.push(PartialToolCall::from_chunk(chunk)),
            }
        }
    }

    fn snapshot(&self) -> Message {
        let mut calls: Vec<&PartialToolCall> = self.tool_calls.iter().collect();
        calls.sort_by_key(|c| c.index);
        Message {
            role: Role::Assistant,
            content: self.content.clone(),
            tool_calls: calls.into_iter().map(PartialToolCall::snapshot).collect(),
            tool_call_id: None,
        }
    }
}

/// Merges the fragments of the in-flight assistant message
#[derive(Debug, Default)]
pub struct PartialMessageAccumulator {
    partial: Option<Partial>,
}

impl PartialMessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partial message is being streamed
    pub fn is_live(&self) -> bool {
        self.partial.is_some()
    }

    /// Begin a new partial message from the first fragment of a turn
    pub fn start(&mut self, fragment: MessageFragment) -> Message {
        let mut partial = Partial::default();
        partial.absorb(fragment);
        let snapshot = partial.snapshot();
        self.partial = Some(partial);
        snapshot
    }

    /// Fold a fragment into the live partial; starts one if none is live
    pub fn merge(&mut self, fragment: MessageFragment) -> Message {
        match self.partial.as_mut() {
            Some(partial) => {
                partial.absorb(fragment);
                partial.snapshot()
            }
            None => self.start(fragment),
        }
    }

    pub fn current(&self) -> Option<Message> {
        self.partial.as_ref().map(Partial::snapshot)
    }

    /// Raw streamed tool calls, arguments unparsed
    pub fn partial_tool_calls(&self) -> &[PartialToolCall] {
        match &self.partial {
            Some(partial) => &partial.tool_calls,
            None => &[],
        }
    }

    pub fn reset(&mut self) {
        self.partial = None;
    }
}
