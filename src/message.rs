//! Transcript message types
//!
//! Messages are compared by value: the engine gives no reliable ids, so
//! dedupe identity is (role, content).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation owned by an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// String argument, ignoring empty strings
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Argument rendered for display: strings verbatim, everything else as JSON.
    /// Null and empty strings count as absent.
    pub fn display_arg(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Arguments serialized as compact JSON
    pub fn args_json(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "{}".to_string())
    }

    /// One-line description shown next to the call in the chat view
    pub fn label(&self) -> String {
        let arg = |key: &str| self.display_arg(key).unwrap_or_default();
        match self.name.as_str() {
            "bash" => format!("Execute command: {}", arg("command")),
            "todo_write" => "Update to-do list".to_string(),
            "read" => format!("Read file: {}", arg("path")),
            "write" => format!("Write file: {}", arg("path")),
            "edit" => format!("Edit file: {}", arg("path")),
            "grep" => {
                let path = self.display_arg("path").unwrap_or_else(|| ".".to_string());
                format!("Search files: {} in {path}", arg("pattern"))
            }
            "ls" => match self.display_arg("match") {
                Some(pattern) => format!("List files: {} with {pattern}", arg("path")),
                None => format!("List files: {}", arg("path")),
            },
            "tree" => {
                let path = self.display_arg("path").unwrap_or_else(|| ".".to_string());
                match self.display_arg("max_depth") {
                    Some(depth) => format!("Explore project structure: {path} --max-depth={depth}"),
                    None => format!("Explore project structure: {path}"),
                }
            }
            "web_search" => format!("Web search: {}", arg("query")),
            "web_crawl" => format!("Web crawl: {}", arg("url")),
            other => format!("Use plugin tool: {other}({})", self.args_json()),
        }
    }
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Dedupe identity: same role and same content
    pub fn same_identity(&self, other: &Message) -> bool {
        self.role == other.role && self.content == other.content
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Status of a to-do entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// One entry of the to-do panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl TodoItem {
    pub fn new(title: impl Into<String>, status: TodoStatus) -> Self {
        Self {
            title: title.into(),
            status,
        }
    }
}

// ============================================================================
// Streaming fragments
// ============================================================================

/// Partial tool call as streamed: keyed by position, arguments are raw JSON text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallChunk {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: String,
}

/// Incremental piece of the assistant message being produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFragment {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_call_chunks: Vec<ToolCallChunk>,
}

impl MessageFragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_call_chunks: vec![],
        }
    }

    pub fn with_chunk(mut self, chunk: ToolCallChunk) -> Self {
        self.tool_call_chunks.push(chunk);
        self
    }
}
