//! Generation engine abstraction
//!
//! The engine is an external collaborator. It accepts new input for a thread
//! and answers with an ordered stream of delta and step-completion events.

use crate::message::{Message, MessageFragment};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Default bound on engine steps per turn
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Events emitted by the engine during one turn
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Token-level fragment of the assistant message currently being produced
    Delta { fragment: MessageFragment },
    /// A processing step finished with these fully-formed messages
    StepCompletion {
        node_name: String,
        messages: Vec<Message>,
    },
}

impl EngineEvent {
    pub fn delta(fragment: MessageFragment) -> Self {
        EngineEvent::Delta { fragment }
    }

    pub fn step(node_name: impl Into<String>, messages: Vec<Message>) -> Self {
        EngineEvent::StepCompletion {
            node_name: node_name.into(),
            messages,
        }
    }
}

/// Stream of engine events for one submission
pub type EventStream = BoxStream<'static, Result<EngineEvent, EngineError>>;

/// Per-submission options passed through to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub thread_id: String,
    pub recursion_limit: u32,
}

/// Engine error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn construction(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Construction, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Transport, message)
    }

    pub fn restore(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Restore, message)
    }
}

/// Where an engine error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// The engine could not be built; fatal to the controller
    Construction,
    /// Submitting or iterating the event stream failed
    Transport,
    /// Seeding a thread with stored history failed
    Restore,
}

impl EngineErrorKind {
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Construction)
    }
}

/// A bound generation engine
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Submit new input on a thread and stream the resulting events
    async fn submit(
        &self,
        input: Vec<Message>,
        options: &SubmitOptions,
    ) -> Result<EventStream, EngineError>;

    /// Seed a thread with previously stored history
    async fn restore(&self, thread_id: &str, history: Vec<Message>) -> Result<(), EngineError>;
}

/// Builds fresh engine bindings; a new one is created on every clear/load
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn GenerationEngine>, EngineError>;
}

#[async_trait]
impl<T: GenerationEngine + ?Sized> GenerationEngine for Arc<T> {
    async fn submit(
        &self,
        input: Vec<Message>,
        options: &SubmitOptions,
    ) -> Result<EventStream, EngineError> {
        (**self).submit(input, options).await
    }

    async fn restore(&self, thread_id: &str, history: Vec<Message>) -> Result<(), EngineError> {
        (**self).restore(thread_id, history).await
    }
}

impl<T: EngineFactory + ?Sized> EngineFactory for Arc<T> {
    fn create(&self) -> Result<Arc<dyn GenerationEngine>, EngineError> {
        (**self).create()
    }
}
