//! Transcript reconciliation
//!
//! Merges the engine's delta stream and step-completion stream into one
//! ordered transcript and derives the sink effects for each event.

pub mod accumulator;
pub mod correlator;
pub mod dedupe;
mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use accumulator::PartialMessageAccumulator;
pub use correlator::{PendingToolCall, PreviewAction, ResolveAction, ToolCallCorrelator, ToolCategory};
pub use dedupe::HistoryDeduper;
pub use effect::Effect;
pub use event::Event;
pub use state::{GenerationState, Transcript};
pub use transition::{transport_error_content, EventReconciler};
