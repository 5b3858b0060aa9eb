//! Conversation logging and usage analytics for studentdesk.
//!
//! Every answered exchange is appended to a per-session log with running
//! statistics; analytics aggregate those logs over a window of days.
//! Logging is best-effort: callers `warn!` on [`LogError`] and carry on.

pub mod file_log;
pub mod model;
pub mod sink;

use std::path::PathBuf;

pub use file_log::{ConversationExport, FileConversationLog};
pub use model::{Analytics, Engagement, LoggedMessage, SessionLog, SessionStats};
pub use sink::{ConversationSink, InMemorySink};

/// Errors from the logging subsystem.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log I/O failed at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("log serialization failed: {0}")]
    Serialization(String),
}
