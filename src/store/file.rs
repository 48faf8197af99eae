//! File-based transcript storage
//!
//! One JSON record per session, grouped by project:
//! ```text
//! {sessions_dir}/
//!   {project_key}/              # sha256 prefix of the project root
//!     {session_id}.json         # SessionRecord
//!     {session_id}.json.tmp     # in-flight write, renamed over the record
//! ```

use super::{validate_session_id, SessionRecord, SessionSummary, StoreError, StoreResult, TranscriptStore};
use crate::config::Config;
use crate::message::Message;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;

/// Directory name for a project's sessions
fn project_key(project_root: &str) -> String {
    let hash = format!("{:x}", Sha256::digest(project_root.as_bytes()));
    hash.chars().take(16).collect()
}

/// Stores each session as a JSON file under its project's directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    /// Directories are created on first save
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sessions_dir.clone())
    }

    pub fn sessions_dir(&self) -> &PathBuf {
        &self.sessions_dir
    }

    fn project_dir(&self, project_root: &str) -> PathBuf {
        self.sessions_dir.join(project_key(project_root))
    }

    fn record_path(&self, session_id: &str, project_root: &str) -> PathBuf {
        self.project_dir(project_root)
            .join(format!("{session_id}.json"))
    }

    fn temp_path(&self, session_id: &str, project_root: &str) -> PathBuf {
        self.project_dir(project_root)
            .join(format!("{session_id}.json.tmp"))
    }

    /// Read a record, treating one stored for another project as missing
    async fn read_record(&self, session_id: &str, project_root: &str) -> StoreResult<SessionRecord> {
        let path = self.record_path(session_id, project_root);
        let contents = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(session_id.to_string()))
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let record: SessionRecord = serde_json::from_str(&contents)?;
        if record.project_root != project_root {
            tracing::warn!(session_id, stored = %record.project_root, requested = project_root, "session record belongs to another project");
            return Err(StoreError::NotFound(session_id.to_string()));
        }
        Ok(record)
    }
}

#[async_trait]
impl TranscriptStore for FileSessionStore {
    async fn save(
        &self,
        session_id: &str,
        project_root: &str,
        messages: &[Message],
    ) -> StoreResult<()> {
        validate_session_id(session_id)?;
        let project_dir = self.project_dir(project_root);
        fs::create_dir_all(&project_dir)
            .await
            .map_err(|e| StoreError::io(&project_dir, e))?;

        let record = SessionRecord {
            session_id: session_id.to_string(),
            project_root: project_root.to_string(),
            saved_at: Utc::now(),
            messages: messages.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&record)?;

        let temp_path = self.temp_path(session_id, project_root);
        let final_path = self.record_path(session_id, project_root);

        // Write to temp file first
        fs::write(&temp_path, &json)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;

        // Atomic rename
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| StoreError::io(&final_path, e))?;

        tracing::debug!(session_id, messages = messages.len(), path = %final_path.display(), "session saved");
        Ok(())
    }

    async fn load(&self, session_id: &str, project_root: &str) -> StoreResult<Vec<Message>> {
        validate_session_id(session_id)?;
        Ok(self.read_record(session_id, project_root).await?.messages)
    }

    async fn list(&self, project_root: &str) -> StoreResult<Vec<SessionSummary>> {
        let project_dir = self.project_dir(project_root);
        let mut entries = match fs::read_dir(&project_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&project_dir, e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&project_dir, e))?
        {
            let file_name = entry.file_name();
            let Some(session_id) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            match self.read_record(session_id, project_root).await {
                Ok(record) => summaries.push(SessionSummary::from(&record)),
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "skipping unreadable session record");
                }
            }
        }

        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }
}
