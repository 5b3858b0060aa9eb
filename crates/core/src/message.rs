//! Message and conversation-session domain types.
//!
//! These are the value objects that flow through the router:
//! user text arrives → a system instruction frames it → the generation
//! backend answers, optionally after a function result is fed back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (base prompt plus retrieved context)
    System,
    /// The student
    User,
    /// The assistant
    Assistant,
    /// Result of a dispatched data function
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// For `Role::Function` messages, the function that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (routing source, confidence, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            function_name: None,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a function result message.
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Function, content);
        msg.function_name = Some(name.into());
        msg
    }

    /// Attach a metadata entry (builder style).
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// A per-session ordered message sequence.
///
/// Invariant: the first message, if present, has `Role::System`, and it is
/// the only system message. It is replaced in place, never duplicated.
/// Every other message is appended in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Session key supplied by the caller
    pub session_id: String,

    /// Ordered messages
    messages: Vec<Message>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added or replaced
    pub last_updated: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a new empty session.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// The ordered message sequence.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The current system message, if one has been installed.
    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.role == Role::System)
    }

    /// Append a non-system message. The session must already carry its
    /// system message so that it stays first.
    pub fn append(&mut self, message: Message) -> Result<(), Error> {
        if message.role == Role::System {
            return Err(Error::Internal(
                "system messages must be installed with replace_system".into(),
            ));
        }
        if self.system_message().is_none() {
            return Err(Error::Internal(format!(
                "session {} has no system message yet",
                self.session_id
            )));
        }
        self.last_updated = Utc::now();
        self.messages.push(message);
        Ok(())
    }

    /// Install the system message: replace the existing one in place, or
    /// prepend it when the session has none yet.
    pub fn replace_system(&mut self, message: Message) -> Result<(), Error> {
        if message.role != Role::System {
            return Err(Error::Internal(format!(
                "replace_system expects a system message, got {}",
                message.role.as_str()
            )));
        }
        self.last_updated = Utc::now();
        match self.messages.first() {
            Some(first) if first.role == Role::System => self.messages[0] = message,
            _ => self.messages.insert(0, message),
        }
        Ok(())
    }

    /// Number of user turns recorded so far.
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}
