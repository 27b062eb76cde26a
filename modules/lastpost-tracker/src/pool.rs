//! Round-robin pool of authenticated X sessions.
//!
//! X rate-limits per account, so the tracker spreads its calls across
//! however many sessions it was given. The pool is constructed by the
//! caller before the run and discarded after it; the orchestrator is the
//! only holder of the cursor.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use lastpost_common::LastpostError;

/// One authenticated X session: the cookie pair the web client uses.
/// `label` exists only for log lines.
#[derive(Debug, Clone, Deserialize)]
pub struct XSession {
    pub label: String,
    pub auth_token: String,
    pub csrf_token: String,
}

pub struct SessionPool {
    sessions: Vec<XSession>,
    cursor: usize,
}

impl SessionPool {
    pub fn new(sessions: Vec<XSession>) -> Self {
        Self { sessions, cursor: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load sessions from a JSON file (an array of session objects).
    pub fn load(path: &Path) -> Result<Self, LastpostError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            LastpostError::Config(format!("cannot read sessions file {}: {e}", path.display()))
        })?;
        let sessions: Vec<XSession> = serde_json::from_str(&raw).map_err(|e| {
            LastpostError::Config(format!("cannot parse sessions file {}: {e}", path.display()))
        })?;

        info!(sessions = sessions.len(), "Loaded X session pool");
        Ok(Self::new(sessions))
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// The session the next fetch should use; `None` when the pool is
    /// empty (platform disabled for this run).
    pub fn current(&self) -> Option<&XSession> {
        if self.sessions.is_empty() {
            return None;
        }
        Some(&self.sessions[self.cursor % self.sessions.len()])
    }

    /// Move to the next session. Call only after [`current`] was actually
    /// used for a fetch; skipped accounts must not advance the rotation.
    ///
    /// [`current`]: SessionPool::current
    pub fn advance(&mut self) {
        self.cursor = self.cursor.wrapping_add(1);
    }
}
