//! Session controller
//!
//! Owns the live session (engine binding, thread id, transcript and
//! reconciler), gates submissions on the generation state and drives one
//! engine stream per turn. Effects returned by the reconciler are dispatched
//! to the sink before the next event is pulled from the stream.

#[cfg(test)]
pub mod testing;

use crate::config::Config;
use crate::engine::{EngineError, EngineFactory, GenerationEngine, SubmitOptions};
use crate::message::Message;
use crate::reconciler::{Effect, Event, EventReconciler, GenerationState, Transcript};
use crate::sink::Sink;
use crate::store::{SessionSummary, StoreError, TranscriptStore};
use chrono::Local;
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

const LOADING_BANNER: &str = "$ Loading agent...";
const LOADED_BANNER: &str = "- Agent loaded successfully.";

/// Errors surfaced to the caller of the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Agent is busy, cannot accept message")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Live conversation bound to one engine thread
struct Session {
    id: String,
    thread_id: String,
    engine: Arc<dyn GenerationEngine>,
    transcript: Transcript,
    reconciler: EventReconciler,
}

impl Session {
    fn fresh(engine: Arc<dyn GenerationEngine>) -> Self {
        Self::restored(new_session_id(), engine, Transcript::new())
    }

    fn restored(id: String, engine: Arc<dyn GenerationEngine>, transcript: Transcript) -> Self {
        Self {
            id,
            thread_id: Uuid::new_v4().to_string(),
            engine,
            transcript,
            reconciler: EventReconciler::new(),
        }
    }
}

fn new_session_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Keeps the generation state out of `Idle` for one turn.
///
/// Dropping it returns the state to `Idle`, including when the `submit`
/// future is cancelled mid-turn.
struct TurnGuard<'a> {
    state: &'a Mutex<GenerationState>,
}

impl TurnGuard<'_> {
    fn advance(&self, next: GenerationState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = ?*state, to = ?next, "generation state");
        *state = next;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.advance(GenerationState::Idle);
    }
}

/// Relays user turns to the engine and engine output to the sink
pub struct SessionController<F, S, T> {
    factory: F,
    sink: S,
    store: T,
    config: Config,
    state: Mutex<GenerationState>,
    session: tokio::sync::Mutex<Session>,
}

impl<F, S, T> SessionController<F, S, T>
where
    F: EngineFactory,
    S: Sink,
    T: TranscriptStore,
{
    /// Build the engine and show the loading banner.
    ///
    /// Engine construction failures are fatal and returned as-is.
    pub fn new(factory: F, sink: S, store: T, config: Config) -> Result<Self, ControllerError> {
        for effect in [Effect::OpenTerminalPanel, Effect::terminal_line(LOADING_BANNER)] {
            effect.dispatch(&sink);
        }

        let engine = match factory.create() {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(error = %e, "failed to construct engine");
                Effect::terminal_output(format!("- Failed to load agent: {e}")).dispatch(&sink);
                return Err(e.into());
            }
        };
        Effect::terminal_output(LOADED_BANNER).dispatch(&sink);

        let session = Session::fresh(engine);
        tracing::info!(session_id = %session.id, thread_id = %session.thread_id, "session started");
        sink.focus_input();

        Ok(Self {
            factory,
            sink,
            store,
            config,
            state: Mutex::new(GenerationState::Idle),
            session: tokio::sync::Mutex::new(session),
        })
    }

    pub fn generation_state(&self) -> GenerationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle -> Streaming, or Busy
    fn claim_turn(&self) -> Result<TurnGuard<'_>, ControllerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_idle() {
            return Err(ControllerError::Busy);
        }
        *state = GenerationState::Streaming;
        Ok(TurnGuard { state: &self.state })
    }

    fn dispatch(&self, effects: &[Effect]) {
        for effect in effects {
            effect.dispatch(&self.sink);
        }
    }

    /// Run one turn for the given user text.
    ///
    /// Rejected with `Busy` unless the session is idle. Engine failures become
    /// an error message in the transcript; the turn still completes.
    pub async fn submit(&self, text: &str) -> Result<(), ControllerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        let turn = self.claim_turn()?;

        let mut session = self.session.lock().await;
        self.run_turn(&mut session, Message::user(text)).await;

        turn.advance(GenerationState::Finalizing);
        self.persist(&session).await;
        drop(session);

        drop(turn);
        self.sink.focus_input();
        Ok(())
    }

    async fn run_turn(&self, session: &mut Session, user_message: Message) {
        let Session {
            id,
            thread_id,
            engine,
            transcript,
            reconciler,
        } = session;
        tracing::info!(session_id = %id, chars = user_message.content.len(), "turn started");

        let effects = reconciler.begin_turn(transcript, user_message.clone());
        self.dispatch(&effects);

        let options = SubmitOptions {
            thread_id: thread_id.clone(),
            recursion_limit: self.config.recursion_limit,
        };
        let mut stream = match engine.submit(vec![user_message], &options).await {
            Ok(stream) => stream,
            Err(e) => {
                let effects = reconciler.handle(transcript, Event::from(e));
                self.dispatch(&effects);
                return;
            }
        };

        let mut events = 0usize;
        while let Some(item) = stream.next().await {
            events += 1;
            let event = Event::from(item);
            let failed = matches!(event, Event::TransportError { .. });
            let effects = reconciler.handle(transcript, event);
            self.dispatch(&effects);
            if failed {
                break;
            }
        }
        tracing::info!(session_id = %id, events, messages = transcript.len(), "turn finished");
    }

    async fn persist(&self, session: &Session) {
        if session.transcript.is_empty() {
            return;
        }
        if let Err(e) = self
            .store
            .save(
                &session.id,
                &self.config.project_root,
                session.transcript.messages(),
            )
            .await
        {
            tracing::warn!(session_id = %session.id, error = %e, "failed to persist transcript");
        }
    }

    /// Start over with a new engine binding, thread and empty transcript
    pub async fn clear(&self) -> Result<(), ControllerError> {
        let mut session = self
            .session
            .try_lock()
            .map_err(|_| ControllerError::Busy)?;
        if !self.generation_state().is_idle() {
            return Err(ControllerError::Busy);
        }

        let engine = self.factory.create()?;
        *session = Session::fresh(engine);
        tracing::info!(session_id = %session.id, thread_id = %session.thread_id, "session cleared");

        self.sink.reset_view();
        self.sink.focus_input();
        Ok(())
    }

    /// Replace the live session with a stored one.
    ///
    /// The stored messages seed a fresh engine thread and are replayed to the
    /// sink. A missing session leaves the live one untouched.
    pub async fn load(&self, session_id: &str) -> Result<(), ControllerError> {
        let mut session = self
            .session
            .try_lock()
            .map_err(|_| ControllerError::Busy)?;
        if !self.generation_state().is_idle() {
            return Err(ControllerError::Busy);
        }

        let messages = self
            .store
            .load(session_id, &self.config.project_root)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => ControllerError::SessionNotFound(id),
                other => ControllerError::Store(other),
            })?;

        let engine = self.factory.create()?;
        let restored = Session::restored(
            session_id.to_string(),
            engine,
            Transcript::from_messages(messages.clone()),
        );
        restored.engine.restore(&restored.thread_id, messages).await?;
        *session = restored;
        tracing::info!(
            session_id,
            thread_id = %session.thread_id,
            messages = session.transcript.len(),
            "session loaded"
        );

        self.sink.reset_view();
        for message in session.transcript.messages() {
            Effect::add(message.clone()).dispatch(&self.sink);
        }
        self.sink.focus_input();
        Ok(())
    }

    /// Stored sessions for the configured project, newest first
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ControllerError> {
        Ok(self.store.list(&self.config.project_root).await?)
    }

    pub async fn session_id(&self) -> String {
        self.session.lock().await.id.clone()
    }

    pub async fn thread_id(&self) -> String {
        self.session.lock().await.thread_id.clone()
    }

    /// Snapshot of the live transcript
    pub async fn transcript(&self) -> Vec<Message> {
        self.session.lock().await.transcript.messages().to_vec()
    }

    /// Tool calls still waiting for their result
    pub async fn pending_tool_calls(&self) -> usize {
        self.session
            .lock()
            .await
            .reconciler
            .correlator()
            .pending_count()
    }
}
