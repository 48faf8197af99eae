//! Session transcript persistence

mod file;

pub use file::FileSessionStore;

use crate::message::{Message, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed session record: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted form of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub project_root: String,
    pub saved_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Listing entry for a stored session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub message_count: usize,
    /// First line of the first user message
    pub title: String,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        let title = record
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.lines().next())
            .unwrap_or_default()
            .to_string();
        Self {
            session_id: record.session_id.clone(),
            saved_at: record.saved_at,
            message_count: record.messages.len(),
            title,
        }
    }
}

/// Session ids become file names, so only a safe character set is accepted
pub fn validate_session_id(session_id: &str) -> StoreResult<()> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !session_id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}

/// Storage for session transcripts
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Replace the stored transcript of a session
    async fn save(&self, session_id: &str, project_root: &str, messages: &[Message])
        -> StoreResult<()>;

    /// Load a project's session messages in their stored order
    async fn load(&self, session_id: &str, project_root: &str) -> StoreResult<Vec<Message>>;

    /// Sessions recorded for a project, newest first
    async fn list(&self, project_root: &str) -> StoreResult<Vec<SessionSummary>>;
}

#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn save(
        &self,
        session_id: &str,
        project_root: &str,
        messages: &[Message],
    ) -> StoreResult<()> {
        (**self).save(session_id, project_root, messages).await
    }

    async fn load(&self, session_id: &str, project_root: &str) -> StoreResult<Vec<Message>> {
        (**self).load(session_id, project_root).await
    }

    async fn list(&self, project_root: &str) -> StoreResult<Vec<SessionSummary>> {
        (**self).list(project_root).await
    }
}
