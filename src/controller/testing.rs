//! Mock implementations for testing
//!
//! These mocks enable controller tests without a real engine, UI or disk.

use crate::engine::{EngineError, EngineEvent, EngineFactory, EventStream, GenerationEngine, SubmitOptions};
use crate::message::{Message, TodoItem};
use crate::sink::{Panel, Sink};
use crate::store::{SessionRecord, SessionSummary, StoreError, StoreResult, TranscriptStore};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// Mock Engine
// ============================================================================

/// What the engine does on the next submission
pub enum ScriptedTurn {
    /// Stream these items, then end
    Events(Vec<Result<EngineEvent, EngineError>>),
    /// Fail the submission itself
    Rejected(EngineError),
    /// Stream whatever the test pushes through the channel
    Channel(mpsc::Receiver<Result<EngineEvent, EngineError>>),
}

/// Engine that replays queued turns
#[derive(Default)]
pub struct MockEngine {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    /// Record of all submissions
    pub submissions: Mutex<Vec<(Vec<Message>, SubmitOptions)>>,
    /// Record of all restores (thread id, history)
    pub restores: Mutex<Vec<(String, Vec<Message>)>>,
}

impl MockEngine {
    pub fn queue_events(&self, events: Vec<EngineEvent>) {
        self.queue_turn(ScriptedTurn::Events(events.into_iter().map(Ok).collect()));
    }

    pub fn queue_turn(&self, turn: ScriptedTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    /// Queue a turn fed by the returned sender
    pub fn queue_channel(&self) -> mpsc::Sender<Result<EngineEvent, EngineError>> {
        let (tx, rx) = mpsc::channel(16);
        self.queue_turn(ScriptedTurn::Channel(rx));
        tx
    }

    pub fn recorded_submissions(&self) -> Vec<(Vec<Message>, SubmitOptions)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn recorded_restores(&self) -> Vec<(String, Vec<Message>)> {
        self.restores.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationEngine for MockEngine {
    async fn submit(
        &self,
        input: Vec<Message>,
        options: &SubmitOptions,
    ) -> Result<EventStream, EngineError> {
        self.submissions
            .lock()
            .unwrap()
            .push((input, options.clone()));
        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(ScriptedTurn::Events(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(ScriptedTurn::Rejected(error)) => Err(error),
            Some(ScriptedTurn::Channel(rx)) => Ok(ReceiverStream::new(rx).boxed()),
            None => Ok(futures::stream::empty().boxed()),
        }
    }

    async fn restore(&self, thread_id: &str, history: Vec<Message>) -> Result<(), EngineError> {
        self.restores
            .lock()
            .unwrap()
            .push((thread_id.to_string(), history));
        Ok(())
    }
}

/// Factory handing out one shared mock engine
#[derive(Default)]
pub struct MockEngineFactory {
    pub engine: Arc<MockEngine>,
    created: AtomicUsize,
    fail: AtomicBool,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail
    pub fn fail_creation(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(&self) -> Result<Arc<dyn GenerationEngine>, EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::construction("model not configured"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.engine.clone())
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// One call received by the sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Add(Message, bool),
    Update(Message, bool),
    OpenTerminalPanel,
    TerminalLine(String, bool),
    ActivePanel(Panel),
    Todos(Vec<TodoItem>),
    OpenFile(String, Option<String>),
    FocusInput,
    ResetView,
}

/// Sink that records every call in order
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Sink for RecordingSink {
    fn add(&self, message: &Message, display_header: bool) {
        self.push(SinkCall::Add(message.clone(), display_header));
    }

    fn update(&self, message: &Message, update_tools: bool) {
        self.push(SinkCall::Update(message.clone(), update_tools));
    }

    fn open_terminal_panel(&self) {
        self.push(SinkCall::OpenTerminalPanel);
    }

    fn write_terminal_line(&self, text: &str, muted: bool) {
        self.push(SinkCall::TerminalLine(text.to_string(), muted));
    }

    fn set_active_panel(&self, panel: Panel) {
        self.push(SinkCall::ActivePanel(panel));
    }

    fn update_todo_panel(&self, items: &[TodoItem]) {
        self.push(SinkCall::Todos(items.to_vec()));
    }

    fn open_file_view(&self, path: &str, content: Option<&str>) {
        self.push(SinkCall::OpenFile(path.to_string(), content.map(String::from)));
    }

    fn focus_input(&self) {
        self.push(SinkCall::FocusInput);
    }

    fn reset_view(&self) {
        self.push(SinkCall::ResetView);
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Transcript store backed by a map
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<(String, String), SessionRecord>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn record(&self, session_id: &str, project_root: &str) -> Option<SessionRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(session_id.to_string(), project_root.to_string()))
            .cloned()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryStore {
    async fn save(
        &self,
        session_id: &str,
        project_root: &str,
        messages: &[Message],
    ) -> StoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                "/dev/full",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.records.lock().unwrap().insert(
            (session_id.to_string(), project_root.to_string()),
            SessionRecord {
                session_id: session_id.to_string(),
                project_root: project_root.to_string(),
                saved_at: Utc::now(),
                messages: messages.to_vec(),
            },
        );
        Ok(())
    }

    async fn load(&self, session_id: &str, project_root: &str) -> StoreResult<Vec<Message>> {
        self.records
            .lock()
            .unwrap()
            .get(&(session_id.to_string(), project_root.to_string()))
            .map(|r| r.messages.clone())
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    async fn list(&self, project_root: &str) -> StoreResult<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.project_root == project_root)
            .map(SessionSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageFragment;

    #[tokio::test]
    async fn test_mock_engine_replays_queued_turns() {
        let engine = MockEngine::default();
        engine.queue_events(vec![EngineEvent::delta(MessageFragment::text("hi"))]);
        engine.queue_turn(ScriptedTurn::Rejected(EngineError::transport("down")));

        let options = SubmitOptions {
            thread_id: "t".to_string(),
            recursion_limit: 10,
        };
        let items: Vec<_> = engine
            .submit(vec![Message::user("a")], &options)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 1);

        assert!(engine.submit(vec![Message::user("b")], &options).await.is_err());
        assert_eq!(engine.recorded_submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryStore::new();
        let messages = vec![Message::user("q"), Message::assistant("a")];
        store.save("s", "/p", &messages).await.unwrap();

        assert_eq!(store.load("s", "/p").await.unwrap(), messages);
        assert!(matches!(store.load("x", "/p").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.load("s", "/q").await, Err(StoreError::NotFound(_))));
        assert_eq!(store.list("/p").await.unwrap().len(), 1);
        assert!(store.list("/q").await.unwrap().is_empty());
    }

    #[test]
    fn test_factory_failure() {
        let factory = MockEngineFactory::new();
        assert!(factory.create().is_ok());
        factory.fail_creation();
        assert!(factory.create().is_err());
        assert_eq!(factory.created_count(), 1);
    }
}
