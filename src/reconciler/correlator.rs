//! Tool call classification and result correlation
//!
//! Every known tool name maps to a category and a preview formatter through
//! one static table. Calls whose results matter are kept pending by id until
//! the matching tool-result message arrives.

use crate::message::{TodoItem, ToolCall};
use crate::sink::Panel;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Marker written when a terminal tool produced no output
pub const EMPTY_OUTPUT: &str = "(empty)";

/// Label written for to-do updates
pub const TODO_LABEL: &str = "Update to-do list";

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fenced block pattern is valid"));

/// How a tool call is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    /// Preview and output go to the terminal panel
    Terminal,
    /// Refreshes the to-do panel
    Todo,
    /// Opens a file view
    FileView,
    /// Unknown or plugin tool
    Generic,
}

impl ToolCategory {
    /// Panel brought to the front when a call of this category is registered
    pub fn home_panel(self) -> Option<Panel> {
        match self {
            ToolCategory::Terminal => Some(Panel::Terminal),
            ToolCategory::Todo => Some(Panel::Todo),
            ToolCategory::FileView | ToolCategory::Generic => None,
        }
    }
}

/// A registered call awaiting its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub category: ToolCategory,
    pub preview: String,
    /// Target file recorded at registration time
    pub path: Option<String>,
}

/// What to show when a call is registered
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewAction {
    TerminalCommand { line: String },
    Todo { label: String, items: Vec<TodoItem> },
    OpenFile { path: String, content: Option<String> },
    Generic { line: String },
}

impl PreviewAction {
    pub fn category(&self) -> ToolCategory {
        match self {
            PreviewAction::TerminalCommand { .. } => ToolCategory::Terminal,
            PreviewAction::Todo { .. } => ToolCategory::Todo,
            PreviewAction::OpenFile { .. } => ToolCategory::FileView,
            PreviewAction::Generic { .. } => ToolCategory::Generic,
        }
    }
}

/// What to show when a call's result arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveAction {
    /// Nothing pending for that id
    None,
    /// Append extracted output to the terminal, muted
    TerminalOutput { text: String },
    /// Re-read the file from disk
    RefreshFile { path: String },
}

struct ToolSpec {
    name: &'static str,
    category: ToolCategory,
    /// Whether a pending entry is kept until the result arrives
    tracks_result: bool,
    /// `None` when required arguments are missing
    preview: fn(&ToolCall) -> Option<PreviewAction>,
}

static TOOL_TABLE: &[ToolSpec] = &[
    ToolSpec {
        name: "bash",
        category: ToolCategory::Terminal,
        tracks_result: true,
        preview: preview_bash,
    },
    ToolSpec {
        name: "grep",
        category: ToolCategory::Terminal,
        tracks_result: true,
        preview: preview_grep,
    },
    ToolSpec {
        name: "ls",
        category: ToolCategory::Terminal,
        tracks_result: true,
        preview: preview_ls,
    },
    ToolSpec {
        name: "tree",
        category: ToolCategory::Terminal,
        tracks_result: true,
        preview: preview_tree,
    },
    ToolSpec {
        name: "todo_write",
        category: ToolCategory::Todo,
        tracks_result: false,
        preview: preview_todo,
    },
    ToolSpec {
        name: "read",
        category: ToolCategory::FileView,
        tracks_result: false,
        preview: preview_read,
    },
    ToolSpec {
        name: "write",
        category: ToolCategory::FileView,
        tracks_result: true,
        preview: preview_write,
    },
    ToolSpec {
        name: "edit",
        category: ToolCategory::FileView,
        tracks_result: true,
        preview: preview_read,
    },
];

fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOL_TABLE.iter().find(|tool| tool.name == name)
}

fn terminal(line: String) -> Option<PreviewAction> {
    Some(PreviewAction::TerminalCommand { line })
}

fn preview_bash(call: &ToolCall) -> Option<PreviewAction> {
    terminal(format!("$ {}", call.str_arg("command").unwrap_or(call.name.as_str())))
}

fn preview_grep(call: &ToolCall) -> Option<PreviewAction> {
    let mut parts = vec!["$ grep".to_string()];
    parts.extend(call.display_arg("pattern"));
    parts.extend(call.display_arg("path"));
    parts.extend(call.display_arg("glob").map(|g| format!("--glob={g}")));
    parts.extend(call.display_arg("output_mode").map(|m| format!("--output={m}")));
    terminal(parts.join(" "))
}

fn preview_ls(call: &ToolCall) -> Option<PreviewAction> {
    let path = call.display_arg("path").unwrap_or_else(|| ".".to_string());
    let mut parts = vec!["$ ls".to_string(), path];
    parts.extend(call.display_arg("match").map(|m| format!("--match={m}")));
    parts.extend(call.display_arg("ignore").map(|i| format!("--ignore={i}")));
    terminal(parts.join(" "))
}

fn preview_tree(call: &ToolCall) -> Option<PreviewAction> {
    let path = call.display_arg("path").unwrap_or_else(|| ".".to_string());
    match call.display_arg("max_depth") {
        Some(depth) => terminal(format!("$ tree {path} --max-depth={depth}")),
        None => terminal(format!("$ tree {path}")),
    }
}

fn preview_todo(call: &ToolCall) -> Option<PreviewAction> {
    let items = call
        .args
        .get("todos")
        .cloned()
        .and_then(|todos| serde_json::from_value::<Vec<TodoItem>>(todos).ok())
        .unwrap_or_default();
    Some(PreviewAction::Todo {
        label: TODO_LABEL.to_string(),
        items,
    })
}

fn preview_read(call: &ToolCall) -> Option<PreviewAction> {
    Some(PreviewAction::OpenFile {
        path: call.str_arg("path")?.to_string(),
        content: None,
    })
}

fn preview_write(call: &ToolCall) -> Option<PreviewAction> {
    Some(PreviewAction::OpenFile {
        path: call.str_arg("path")?.to_string(),
        content: call
            .args
            .get("content")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

fn preview_generic(call: &ToolCall) -> PreviewAction {
    PreviewAction::Generic {
        line: format!("(use plugin tool {} with {})", call.name, call.args_json()),
    }
}

/// Output shown in the terminal for a tool result: the first fenced block,
/// or the whole content when there is none.
pub fn terminal_output(content: &str) -> String {
    let extracted = match FENCED_BLOCK.captures(content).and_then(|caps| caps.get(1)) {
        Some(block) => {
            let block = block.as_str();
            let block = block.strip_prefix('\n').unwrap_or(block);
            block.strip_suffix('\n').unwrap_or(block)
        }
        None => content,
    };
    if extracted.trim().is_empty() {
        EMPTY_OUTPUT.to_string()
    } else {
        extracted.to_string()
    }
}

/// Tracks registered tool calls until their results arrive
#[derive(Debug, Default)]
pub struct ToolCallCorrelator {
    pending: HashMap<String, PendingToolCall>,
}

impl ToolCallCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a call, record it if its result matters, and return its preview
    pub fn register(&mut self, call: &ToolCall) -> PreviewAction {
        let classified = lookup(&call.name).and_then(|tool| Some((tool, (tool.preview)(call)?)));
        let Some((tool, action)) = classified else {
            tracing::debug!(tool = %call.name, id = %call.id, "generic tool call");
            return preview_generic(call);
        };

        if tool.tracks_result {
            let (preview, path) = match &action {
                PreviewAction::OpenFile { path, .. } => (path.clone(), Some(path.clone())),
                PreviewAction::TerminalCommand { line } | PreviewAction::Generic { line } => {
                    (line.clone(), None)
                }
                PreviewAction::Todo { label, .. } => (label.clone(), None),
            };
            let entry = PendingToolCall {
                category: tool.category,
                preview,
                path,
            };
            if self.pending.insert(call.id.clone(), entry).is_some() {
                tracing::warn!(id = %call.id, "tool call id registered twice, replacing");
            }
        }
        action
    }

    /// Match a result against its pending call. Unknown ids are a no-op.
    pub fn resolve(&mut self, id: &str, content: &str) -> ResolveAction {
        let Some(pending) = self.pending.remove(id) else {
            tracing::debug!(id, "no pending tool call for result");
            return ResolveAction::None;
        };
        match (pending.category, pending.path) {
            (ToolCategory::Terminal, _) => ResolveAction::TerminalOutput {
                text: terminal_output(content),
            },
            (ToolCategory::FileView, Some(path)) => ResolveAction::RefreshFile { path },
            _ => ResolveAction::None,
        }
    }

    pub fn pending(&self, id: &str) -> Option<&PendingToolCall> {
        self.pending.get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
