//! Inputs to the reconciler

use crate::engine::{EngineError, EngineEvent};
use crate::message::{Message, MessageFragment};

/// Events consumed by the reconciler, strictly in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Delta {
        fragment: MessageFragment,
    },
    StepCompletion {
        node_name: String,
        messages: Vec<Message>,
    },
    /// The engine stream failed; ends the turn
    TransportError {
        message: String,
    },
}

impl From<EngineEvent> for Event {
    fn from(event: EngineEvent) -> Self {
        match event {
            EngineEvent::Delta { fragment } => Event::Delta { fragment },
            EngineEvent::StepCompletion {
                node_name,
                messages,
            } => Event::StepCompletion {
                node_name,
                messages,
            },
        }
    }
}

impl From<EngineError> for Event {
    fn from(error: EngineError) -> Self {
        Event::TransportError {
            message: error.message,
        }
    }
}

impl From<Result<EngineEvent, EngineError>> for Event {
    fn from(item: Result<EngineEvent, EngineError>) -> Self {
        item.map_or_else(Event::from, Event::from)
    }
}
