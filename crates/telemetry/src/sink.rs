//! Where answered exchanges are recorded.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::LogError;
use crate::model::{LoggedMessage, SessionLog};

/// Append-only per-session conversation log.
///
/// Writes are best-effort from the router's point of view: a failing sink
/// never changes the answer returned to the caller.
#[async_trait]
pub trait ConversationSink: Send + Sync {
    fn name(&self) -> &str;

    /// Append one turn to the session's log.
    async fn record(&self, session_id: &str, message: LoggedMessage) -> Result<(), LogError>;

    /// Append a user turn and the assistant turn answering it.
    async fn record_exchange(
        &self,
        session_id: &str,
        user: LoggedMessage,
        assistant: LoggedMessage,
    ) -> Result<(), LogError> {
        self.record(session_id, user).await?;
        self.record(session_id, assistant).await
    }
}

/// Keeps session logs in memory. Used when no log directory is wanted.
#[derive(Default)]
pub struct InMemorySink {
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionLog> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn sessions(&self) -> Vec<SessionLog> {
        self.sessions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ConversationSink for InMemorySink {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn record(&self, session_id: &str, message: LoggedMessage) -> Result<(), LogError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLog::new(session_id))
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studentdesk_core::routing::{ResponseSource, RoutingDecision};

    #[tokio::test]
    async fn exchange_appends_both_turns() {
        let sink = InMemorySink::new();
        sink.record_exchange(
            "s1",
            LoggedMessage::user("hi"),
            LoggedMessage::assistant("hello", &RoutingDecision::new(ResponseSource::Generation)),
        )
        .await
        .unwrap();

        let log = sink.session("s1").await.unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.stats.bot_messages, 1);
        assert!(sink.session("s2").await.is_none());
    }
}
