//! File-backed conversation log: one pretty-printed JSON file per session.
//!
//! Layout under the log directory:
//!
//! ```text
//! sessions/<session_id>[.<hash>].json
//! analytics/analytics_<YYYYMMDD>.json
//! conversation_export_<YYYYMMDD_HHMMSS>.json
//! ```
//!
//! Every record rewrites the session's file with refreshed stats.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::LogError;
use crate::model::{Analytics, LoggedMessage, SessionLog};
use crate::sink::ConversationSink;

/// Everything written by [`FileConversationLog::export`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub exported_at: DateTime<Utc>,
    pub sessions: Vec<SessionLog>,
    /// Last 30 days
    pub analytics: Analytics,
    pub total_files: usize,
}

pub struct FileConversationLog {
    dir: PathBuf,
    /// Serializes read-modify-write of session files.
    write_lock: Mutex<()>,
}

/// Session IDs come from callers; keep file names inside the sessions dir.
///
/// Safe IDs map to themselves. Any other ID is sanitized and suffixed with
/// `.<hash>` of the raw ID; safe IDs never contain `.`, so the two forms
/// cannot collide and distinct raw IDs get distinct files.
fn file_stem(session_id: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !session_id.is_empty() && session_id.chars().all(safe) {
        return session_id.to_string();
    }
    let stem: String = session_id
        .chars()
        .map(|c| if safe(c) { c } else { '_' })
        .collect();
    format!("{stem}.{:016x}", fnv1a(session_id.as_bytes()))
}

/// FNV-1a, 64 bit. Stable across builds, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> LogError {
    LogError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LogError> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| LogError::Serialization(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| io_error(path, e))
}

impl FileConversationLog {
    /// Open (creating if needed) a log directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LogError> {
        let dir = dir.into();
        for sub in ["sessions", "analytics"] {
            let path = dir.join(sub);
            std::fs::create_dir_all(&path).map_err(|e| io_error(&path, e))?;
        }
        info!(dir = %dir.display(), "Conversation log initialized");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir
            .join("sessions")
            .join(format!("{}.json", file_stem(session_id)))
    }

    /// The stored log for a session, if one exists.
    pub fn load_session(&self, session_id: &str) -> Result<Option<SessionLog>, LogError> {
        let path = self.session_path(session_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| LogError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Every readable session log. Unreadable files are skipped with a warning.
    pub fn sessions(&self) -> Result<Vec<SessionLog>, LogError> {
        let dir = self.dir.join("sessions");
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str::<SessionLog>(&c).map_err(|e| e.to_string()));
            match parsed {
                Ok(log) => sessions.push(log),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session log"),
            }
        }
        sessions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(sessions)
    }

    /// Aggregate the last `days` days and save a dated snapshot under
    /// `analytics/`.
    pub fn analytics(&self, days: u32) -> Result<Analytics, LogError> {
        let now = Utc::now();
        let analytics = Analytics::compute(&self.sessions()?, days, now);
        let path = self
            .dir
            .join("analytics")
            .join(format!("analytics_{}.json", now.format("%Y%m%d")));
        write_json(&path, &analytics)?;
        Ok(analytics)
    }

    /// Write all session logs plus 30-day analytics into one file.
    /// Returns the path written.
    pub fn export(&self, output: Option<&Path>) -> Result<PathBuf, LogError> {
        let now = Utc::now();
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => self
                .dir
                .join(format!("conversation_export_{}.json", now.format("%Y%m%d_%H%M%S"))),
        };

        let sessions = self.sessions()?;
        let export = ConversationExport {
            exported_at: now,
            analytics: Analytics::compute(&sessions, 30, now),
            total_files: sessions.len(),
            sessions,
        };
        write_json(&path, &export)?;
        info!(path = %path.display(), sessions = export.total_files, "Exported conversation logs");
        Ok(path)
    }
}

#[async_trait]
impl ConversationSink for FileConversationLog {
    fn name(&self) -> &str {
        "file"
    }

    async fn record(&self, session_id: &str, message: LoggedMessage) -> Result<(), LogError> {
        let _guard = self.write_lock.lock().await;

        let mut log = match self.load_session(session_id) {
            Ok(Some(log)) => log,
            Ok(None) => SessionLog::new(session_id),
            Err(e) => {
                warn!(session_id, error = %e, "Session log unreadable, starting a new one");
                SessionLog::new(session_id)
            }
        };
        log.push(message);
        write_json(&self.session_path(session_id), &log)?;
        debug!(session_id, messages = log.messages.len(), "Logged message");
        Ok(())
    }
}
