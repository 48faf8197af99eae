//! Sink calls produced by the reconciler

use crate::message::{Message, Role, TodoItem};
use crate::sink::{Panel, Sink};

/// Side effects to dispatch to the sink, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Add {
        message: Message,
        display_header: bool,
    },
    Update {
        message: Message,
        update_tools: bool,
    },
    OpenTerminalPanel,
    WriteTerminal {
        text: String,
        muted: bool,
    },
    SetActivePanel(Panel),
    UpdateTodos(Vec<TodoItem>),
    OpenFile {
        path: String,
        content: Option<String>,
    },
}

impl Effect {
    pub fn add(message: Message) -> Self {
        let display_header = message.role != Role::Tool;
        Effect::Add {
            message,
            display_header,
        }
    }

    pub fn update(message: Message, update_tools: bool) -> Self {
        Effect::Update {
            message,
            update_tools,
        }
    }

    pub fn terminal_line(text: impl Into<String>) -> Self {
        Effect::WriteTerminal {
            text: text.into(),
            muted: false,
        }
    }

    pub fn terminal_output(text: impl Into<String>) -> Self {
        Effect::WriteTerminal {
            text: text.into(),
            muted: true,
        }
    }

    /// Perform this effect against a sink
    pub fn dispatch<S: Sink + ?Sized>(&self, sink: &S) {
        match self {
            Effect::Add {
                message,
                display_header,
            } => sink.add(message, *display_header),
            Effect::Update {
                message,
                update_tools,
            } => sink.update(message, *update_tools),
            Effect::OpenTerminalPanel => sink.open_terminal_panel(),
            Effect::WriteTerminal { text, muted } => sink.write_terminal_line(text, *muted),
            Effect::SetActivePanel(panel) => sink.set_active_panel(*panel),
            Effect::UpdateTodos(items) => sink.update_todo_panel(items),
            Effect::OpenFile { path, content } => sink.open_file_view(path, content.as_deref()),
        }
    }
}
