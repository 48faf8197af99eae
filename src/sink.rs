//! Presentation sink
//!
//! The sink only receives calls; it never mutates the transcript.

use crate::message::{Message, TodoItem};
use std::sync::Arc;

/// Side panels that tool calls can bring to the front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Terminal,
    Todo,
}

impl Panel {
    pub fn id(self) -> &'static str {
        match self {
            Panel::Terminal => "terminal-tab",
            Panel::Todo => "todo-tab",
        }
    }
}

/// Presentation-layer collaborator
pub trait Sink: Send + Sync {
    /// Append a message to the chat view
    fn add(&self, message: &Message, display_header: bool);

    /// Replace the last message in the chat view
    fn update(&self, message: &Message, update_tools: bool);

    fn open_terminal_panel(&self);

    fn write_terminal_line(&self, text: &str, muted: bool);

    fn set_active_panel(&self, panel: Panel);

    fn update_todo_panel(&self, items: &[TodoItem]);

    /// Open a file view; `None` content means read the file from disk
    fn open_file_view(&self, path: &str, content: Option<&str>);

    /// Input may be accepted again
    fn focus_input(&self) {}

    /// Drop all displayed state (session cleared or replaced)
    fn reset_view(&self) {}
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn add(&self, message: &Message, display_header: bool) {
        (**self).add(message, display_header);
    }

    fn update(&self, message: &Message, update_tools: bool) {
        (**self).update(message, update_tools);
    }

    fn open_terminal_panel(&self) {
        (**self).open_terminal_panel();
    }

    fn write_terminal_line(&self, text: &str, muted: bool) {
        (**self).write_terminal_line(text, muted);
    }

    fn set_active_panel(&self, panel: Panel) {
        (**self).set_active_panel(panel);
    }

    fn update_todo_panel(&self, items: &[TodoItem]) {
        (**self).update_todo_panel(items);
    }

    fn open_file_view(&self, path: &str, content: Option<&str>) {
        (**self).open_file_view(path, content);
    }

    fn focus_input(&self) {
        (**self).focus_input();
    }

    fn reset_view(&self) {
        (**self).reset_view();
    }
}

/// Logging wrapper for sinks
pub struct LoggingSink<S> {
    inner: S,
}

impl<S: Sink> LoggingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Sink> Sink for LoggingSink<S> {
    fn add(&self, message: &Message, display_header: bool) {
        tracing::debug!(
            role = ?message.role,
            content_len = message.content.len(),
            tool_calls = message.tool_calls.len(),
            display_header,
            "sink add"
        );
        self.inner.add(message, display_header);
    }

    fn update(&self, message: &Message, update_tools: bool) {
        tracing::trace!(
            content_len = message.content.len(),
            tool_calls = message.tool_calls.len(),
            update_tools,
            "sink update"
        );
        self.inner.update(message, update_tools);
    }

    fn open_terminal_panel(&self) {
        tracing::debug!("sink open terminal panel");
        self.inner.open_terminal_panel();
    }

    fn write_terminal_line(&self, text: &str, muted: bool) {
        tracing::debug!(len = text.len(), muted, "sink terminal line");
        self.inner.write_terminal_line(text, muted);
    }

    fn set_active_panel(&self, panel: Panel) {
        tracing::debug!(panel = panel.id(), "sink active panel");
        self.inner.set_active_panel(panel);
    }

    fn update_todo_panel(&self, items: &[TodoItem]) {
        tracing::debug!(items = items.len(), "sink todo panel");
        self.inner.update_todo_panel(items);
    }

    fn open_file_view(&self, path: &str, content: Option<&str>) {
        tracing::debug!(path, reread = content.is_none(), "sink open file");
        self.inner.open_file_view(path, content);
    }

    fn focus_input(&self) {
        self.inner.focus_input();
    }

    fn reset_view(&self) {
        tracing::debug!("sink reset view");
        self.inner.reset_view();
    }
}
