//! Conversation sessions keyed by session ID.
//!
//! Each session sits behind its own async mutex, so requests for the same
//! session run one at a time in arrival order while different sessions
//! proceed independently. The store is bounded: it evicts the least
//! recently used session when full and drops sessions idle past the TTL.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use studentdesk_core::error::Error;
use studentdesk_core::message::{ConversationSession, Message};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

struct Slot {
    session: SessionHandle,
    /// Milliseconds since the store's origin
    touched: AtomicU64,
}

impl Slot {
    fn touch(&self, now: u64) {
        self.touched.store(now, Ordering::Relaxed);
    }

    fn touched(&self) -> u64 {
        self.touched.load(Ordering::Relaxed)
    }

    /// A handle outside the store exists, so a request holds or awaits the
    /// session lock.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Slot>,
    max_sessions: usize,
    idle_ttl: Option<Duration>,
    origin: Instant,
}

impl SessionStore {
    /// `idle_ttl` of `None` keeps sessions until evicted for capacity.
    pub fn new(max_sessions: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            idle_ttl,
            origin: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sweep_expired(&self, now: u64) {
        let Some(ttl) = self.idle_ttl else {
            return;
        };
        let ttl = ttl.as_millis() as u64;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| slot.in_use() || now.saturating_sub(slot.touched()) < ttl);
        let expired = before.saturating_sub(self.sessions.len());
        if expired > 0 {
            debug!(expired, "Expired idle sessions");
        }
    }

    /// Sessions in use are never evicted. When every session is in use the
    /// store runs over capacity until one is released.
    fn evict_lru(&self) {
        let oldest = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().in_use())
            .min_by_key(|entry| entry.value().touched())
            .map(|entry| entry.key().clone());
        let Some(id) = oldest else {
            debug!(sessions = self.sessions.len(), "All sessions in use, over capacity");
            return;
        };
        if self.sessions.remove_if(&id, |_, slot| !slot.in_use()).is_some() {
            debug!(session_id = %id, "Evicted least recently used session");
        }
    }

    /// The session for `session_id`, created empty on first use.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        let now = self.now_ms();
        self.sweep_expired(now);

        if let Some(slot) = self.sessions.get(session_id) {
            slot.touch(now);
            return Arc::clone(&slot.session);
        }

        if self.sessions.len() >= self.max_sessions {
            self.evict_lru();
        }

        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Slot {
                session: Arc::new(Mutex::new(ConversationSession::new(session_id))),
                touched: AtomicU64::new(now),
            });
        slot.touch(now);
        Arc::clone(&slot.session)
    }

    /// Exclusive access to a session until the guard is dropped. Waiters are
    /// served in the order they called `lock`.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<ConversationSession> {
        self.get_or_create(session_id).lock_owned().await
    }

    pub async fn append(&self, session_id: &str, message: Message) -> Result<(), Error> {
        self.lock(session_id).await.append(message)
    }

    pub async fn replace_system(&self, session_id: &str, message: Message) -> Result<(), Error> {
        self.lock(session_id).await.replace_system(message)
    }

    /// A copy of the session, without creating it.
    pub async fn snapshot(&self, session_id: &str) -> Option<ConversationSession> {
        let handle = self.sessions.get(session_id).map(|slot| Arc::clone(&slot.session))?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
