//! Environment-driven configuration

use crate::engine::DEFAULT_RECURSION_LIMIT;
use std::path::PathBuf;

/// Runtime configuration for a session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding persisted session records
    pub sessions_dir: PathBuf,
    /// Project the sessions belong to
    pub project_root: String,
    /// Passed to the engine with every submission
    pub recursion_limit: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sessions_dir = lookup("TURN_RELAY_SESSIONS_DIR").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".turn-relay").join("sessions")
            },
            PathBuf::from,
        );

        let project_root = lookup("TURN_RELAY_PROJECT_ROOT").unwrap_or_else(|| {
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| ".".to_string())
        });

        let recursion_limit = lookup("TURN_RELAY_RECURSION_LIMIT")
            .and_then(|v| v.parse().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_RECURSION_LIMIT);

        Self {
            sessions_dir,
            project_root,
            recursion_limit,
        }
    }
}
