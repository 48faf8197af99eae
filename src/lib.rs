//! Turn Relay - streaming conversation relay for an agent UI
//!
//! Sits between a generation engine and a display sink. Each user turn is
//! submitted to the engine; its interleaved delta and step-completion events
//! are reconciled into one ordered transcript, tool calls are previewed in the
//! panel that fits them and resolved when their results arrive, and the
//! finished transcript is persisted per session.

pub mod config;
pub mod controller;
pub mod engine;
pub mod logging;
pub mod message;
pub mod reconciler;
pub mod sink;
pub mod store;

pub use config::Config;
pub use controller::{ControllerError, SessionController};
pub use engine::{EngineError, EngineEvent, EngineFactory, GenerationEngine, SubmitOptions};
pub use message::{Message, MessageFragment, Role, TodoItem, TodoStatus, ToolCall, ToolCallChunk};
pub use reconciler::{Effect, Event, EventReconciler, GenerationState, Transcript};
pub use sink::{LoggingSink, Panel, Sink};
pub use store::{FileSessionStore, SessionSummary, StoreError, TranscriptStore};
