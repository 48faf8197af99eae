//! Dual-stream reconciliation
//!
//! Folds delta and step-completion events into the transcript and turns them
//! into an ordered list of sink effects. Nothing here performs I/O; the
//! controller dispatches the returned effects before feeding the next event.

use super::accumulator::PartialMessageAccumulator;
use super::correlator::{PreviewAction, ResolveAction, ToolCallCorrelator};
use super::dedupe::HistoryDeduper;
use super::{Effect, Event, Transcript};
use crate::message::{Message, MessageFragment, Role};

/// Content of the synthetic message appended when the engine stream fails
pub fn transport_error_content(error: &str) -> String {
    format!("**An error occurred:** {error}\n\nPlease try again.")
}

/// State machine consuming the engine's dual event stream
#[derive(Debug, Default)]
pub struct EventReconciler {
    accumulator: PartialMessageAccumulator,
    correlator: ToolCallCorrelator,
    deduper: HistoryDeduper,
}

impl EventReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user's submission and anchor history dedupe on it
    pub fn begin_turn(&mut self, transcript: &mut Transcript, user_message: Message) -> Vec<Effect> {
        self.accumulator.reset();
        transcript.end_streaming();
        self.deduper.begin_turn(user_message.clone());
        transcript.push(user_message.clone());
        vec![Effect::add(user_message)]
    }

    /// Process one event. Effects must be dispatched before the next call.
    pub fn handle(&mut self, transcript: &mut Transcript, event: Event) -> Vec<Effect> {
        match event {
            Event::Delta { fragment } => self.on_delta(transcript, fragment),
            Event::StepCompletion {
                node_name,
                messages,
            } => self.on_step_completion(transcript, &node_name, messages),
            Event::TransportError { message } => self.on_transport_error(transcript, &message),
        }
    }

    fn on_delta(&mut self, transcript: &mut Transcript, fragment: MessageFragment) -> Vec<Effect> {
        if self.accumulator.is_live() {
            // Tool calls are not re-rendered while their arguments are partial JSON
            let snapshot = self.accumulator.merge(fragment);
            transcript.replace_streaming(snapshot.clone());
            vec![Effect::update(snapshot, false)]
        } else {
            let snapshot = self.accumulator.start(fragment);
            transcript.begin_streaming(snapshot.clone());
            vec![Effect::add(snapshot)]
        }
    }

    fn on_step_completion(
        &mut self,
        transcript: &mut Transcript,
        node_name: &str,
        messages: Vec<Message>,
    ) -> Vec<Effect> {
        let streamed = self.accumulator.is_live();
        self.accumulator.reset();

        let received = messages.len();
        let fresh = self.deduper.filter(messages);
        tracing::debug!(node = node_name, received, fresh = fresh.len(), streamed, "step completed");

        let mut effects = Vec::new();
        let mut first_assistant = true;
        for message in fresh {
            match message.role {
                Role::Assistant => {
                    let calls = message.tool_calls.clone();
                    if first_assistant && streamed {
                        transcript.replace_streaming(message.clone());
                        effects.push(Effect::update(message, true));
                    } else {
                        transcript.push(message.clone());
                        effects.push(Effect::add(message));
                    }
                    first_assistant = false;

                    for call in &calls {
                        let action = self.correlator.register(call);
                        tracing::info!(tool = %call.name, id = %call.id, label = %call.label(), "tool call");
                        effects.extend(preview_effects(action));
                    }
                }
                Role::Tool => {
                    transcript.push(message.clone());
                    effects.push(Effect::add(message.clone()));
                    match message.tool_call_id.as_deref() {
                        Some(id) => {
                            let action = self.correlator.resolve(id, &message.content);
                            effects.extend(resolve_effects(action));
                        }
                        None => tracing::warn!("tool result without tool_call_id"),
                    }
                }
                Role::User => {
                    tracing::trace!("skipping echoed user message");
                }
            }
        }

        transcript.end_streaming();
        effects
    }

    fn on_transport_error(&mut self, transcript: &mut Transcript, error: &str) -> Vec<Effect> {
        tracing::error!(error, "engine stream failed");
        self.accumulator.reset();
        transcript.end_streaming();

        let message = Message::assistant(transport_error_content(error));
        transcript.push(message.clone());
        vec![Effect::add(message)]
    }

    pub fn correlator(&self) -> &ToolCallCorrelator {
        &self.correlator
    }

    pub fn is_streaming(&self) -> bool {
        self.accumulator.is_live()
    }

    /// Drop all per-session state
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.correlator.reset();
        self.deduper.reset();
    }
}

fn preview_effects(action: PreviewAction) -> Vec<Effect> {
    let home = action.category().home_panel();
    let mut effects = match action {
        PreviewAction::TerminalCommand { line } | PreviewAction::Generic { line } => {
            vec![Effect::terminal_line(line)]
        }
        PreviewAction::Todo { label, items } => {
            tracing::debug!(label = %label, items = items.len(), "todo update");
            vec![Effect::UpdateTodos(items)]
        }
        PreviewAction::OpenFile { path, content } => vec![Effect::OpenFile { path, content }],
    };
    effects.extend(home.map(Effect::SetActivePanel));
    effects
}

fn resolve_effects(action: ResolveAction) -> Vec<Effect> {
    match action {
        ResolveAction::None => vec![],
        ResolveAction::TerminalOutput { text } => vec![Effect::terminal_output(text)],
        ResolveAction::RefreshFile { path } => vec![Effect::OpenFile {
            path,
            content: None,
        }],
    }
}
