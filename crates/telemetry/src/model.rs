//! Conversation log records, per-session statistics and aggregate analytics.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use studentdesk_core::message::Role;
use studentdesk_core::routing::{ResponseSource, RoutingDecision};

/// One logged turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub role: Role,
    pub content: String,

    /// Set on assistant turns only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,

    pub timestamp: DateTime<Utc>,

    /// Routing extras: `faq_confidence`, `rag_used`, `function`
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LoggedMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            source: None,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// An assistant turn tagged with the decision that produced it.
    pub fn assistant(content: impl Into<String>, decision: &RoutingDecision) -> Self {
        let mut metadata = decision.to_metadata();
        metadata.remove("source");
        Self {
            role: Role::Assistant,
            content: content.into(),
            source: Some(decision.source),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

fn empty_source_counts() -> BTreeMap<String, usize> {
    ResponseSource::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect()
}

/// Statistics over one session's logged turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub bot_messages: usize,
    /// Mean assistant reply length in characters
    pub avg_response_length: f64,
    pub response_sources: BTreeMap<String, usize>,
    /// From the first to the last logged turn
    pub duration_minutes: f64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            total_messages: 0,
            user_messages: 0,
            bot_messages: 0,
            avg_response_length: 0.0,
            response_sources: empty_source_counts(),
            duration_minutes: 0.0,
        }
    }
}

impl SessionStats {
    pub fn compute(messages: &[LoggedMessage]) -> Self {
        let mut stats = Self {
            total_messages: messages.len(),
            ..Self::default()
        };
        let mut reply_chars = 0usize;

        for msg in messages {
            match msg.role {
                Role::User => stats.user_messages += 1,
                Role::Assistant => {
                    stats.bot_messages += 1;
                    reply_chars += msg.content.chars().count();
                    if let Some(source) = msg.source {
                        *stats
                            .response_sources
                            .entry(source.as_str().to_string())
                            .or_default() += 1;
                    }
                }
                Role::System | Role::Function => {}
            }
        }

        if stats.bot_messages > 0 {
            stats.avg_response_length = reply_chars as f64 / stats.bot_messages as f64;
        }
        if let (Some(first), Some(last)) = (messages.first(), messages.last()) {
            let elapsed = last.timestamp - first.timestamp;
            stats.duration_minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
        }
        stats
    }
}

/// The persisted log of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub session_id: String,
    /// When the log was started
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<LoggedMessage>,
    #[serde(default)]
    pub stats: SessionStats,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

impl SessionLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            timestamp: now,
            messages: Vec::new(),
            stats: SessionStats::default(),
            metadata: serde_json::Map::new(),
            last_updated: now,
        }
    }

    /// Append a turn and refresh the stats.
    pub fn push(&mut self, message: LoggedMessage) {
        self.last_updated = message.timestamp.max(self.last_updated);
        self.messages.push(message);
        self.stats = SessionStats::compute(&self.messages);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// At most 3 messages
    pub short_sessions: usize,
    /// 4 to 10 messages
    pub medium_sessions: usize,
    /// More than 10 messages
    pub long_sessions: usize,
}

impl Engagement {
    fn count(&mut self, messages: usize) {
        match messages {
            0..=3 => self.short_sessions += 1,
            4..=10 => self.medium_sessions += 1,
            _ => self.long_sessions += 1,
        }
    }
}

/// Aggregate over every session started within the last `period_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub period_days: u32,
    pub total_sessions: usize,
    pub total_messages: usize,
    pub avg_messages_per_session: f64,
    pub response_sources: BTreeMap<String, usize>,
    pub user_engagement: Engagement,
    /// Hour of day (UTC) → logged turns
    pub peak_hours: BTreeMap<u32, usize>,
    pub generated_at: DateTime<Utc>,
}

impl Analytics {
    pub fn compute<'a>(
        sessions: impl IntoIterator<Item = &'a SessionLog>,
        days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let cutoff = now - Duration::days(i64::from(days));
        let mut analytics = Self {
            period_days: days,
            total_sessions: 0,
            total_messages: 0,
            avg_messages_per_session: 0.0,
            response_sources: empty_source_counts(),
            user_engagement: Engagement::default(),
            peak_hours: BTreeMap::new(),
            generated_at: now,
        };

        for session in sessions.into_iter().filter(|s| s.timestamp >= cutoff) {
            analytics.total_sessions += 1;
            analytics.total_messages += session.stats.total_messages;
            for (source, count) in &session.stats.response_sources {
                *analytics.response_sources.entry(source.clone()).or_default() += count;
            }
            analytics.user_engagement.count(session.stats.total_messages);
            for msg in &session.messages {
                *analytics.peak_hours.entry(msg.timestamp.hour()).or_default() += 1;
            }
        }

        if analytics.total_sessions > 0 {
            analytics.avg_messages_per_session =
                analytics.total_messages as f64 / analytics.total_sessions as f64;
        }
        analytics
    }

    /// The busiest hour, if any turns were logged.
    pub fn peak_hour(&self) -> Option<u32> {
        self.peak_hours
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(hour, _)| *hour)
    }
}
