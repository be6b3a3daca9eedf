use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::SessionStoreError;

pub type Result<T> = std::result::Result<T, SessionStoreError>;

/// Lifecycle of a session record across the IdP redirect round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Redirected to the IdP, no token yet
    Pending,
    /// Code exchanged, token stored
    Authenticated,
}

/// Server-side session record keyed by the `SESSION_ID` cookie value
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    /// Bearer token from the IdP; empty while pending
    pub token: String,
    /// Resource the client was heading for when first intercepted; empty if unknown
    pub original_url: String,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: &str, token: &str, original_url: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            token: token.to_string(),
            original_url: original_url.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.token.is_empty() {
            SessionState::Pending
        } else {
            SessionState::Authenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }
}

/// Opaque session identifier generation
pub struct SessionId;

impl SessionId {
    /// 32 random bytes, URL-safe base64 without padding (cookie safe)
    pub fn generate() -> String {
        let mut rng = rand::thread_rng();
        let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
        URL_SAFE_NO_PAD.encode(&random_bytes)
    }
}

/// Keyed store owning the authoritative copy of every session.
///
/// Callers only ever hold the session id. `put` is a create-or-replace
/// upsert: fields are never merged, so a caller that wants to keep a value
/// must read it first.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current record for `session_id`, or `None` if unknown or expired.
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Unconditionally create or overwrite the record for `session_id`.
    async fn put(&self, session_id: &str, token: &str, original_url: &str) -> Result<()>;

    /// Record a pending session unless the current record is authenticated.
    ///
    /// The check and the write happen atomically for the key. Returns `false`
    /// when an authenticated record was found and left untouched.
    async fn put_pending(&self, session_id: &str, original_url: &str) -> Result<bool>;

    /// Drop records past their TTL. Returns how many were removed.
    async fn evict_expired(&self) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Process-local store over a sharded concurrent map.
///
/// Per-key serialization comes from the DashMap shard lock held by the
/// entry API, so `put_pending` cannot interleave with a concurrent `put`
/// on the same id.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records untouched for longer than `ttl` count as absent.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now.signed_duration_since(session.updated_at) > ttl,
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let now = Utc::now();
        let found = self.sessions.get(session_id).map(|entry| entry.value().clone());

        match found {
            Some(session) if self.is_expired(&session, now) => {
                // The read guard is released above; removing here cannot deadlock.
                self.sessions.remove_if(session_id, |_, s| self.is_expired(s, now));
                debug!(session_id = %session_id, "Session expired on read");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn put(&self, session_id: &str, token: &str, original_url: &str) -> Result<()> {
        self.sessions
            .insert(session_id.to_string(), Session::new(session_id, token, original_url));
        Ok(())
    }

    async fn put_pending(&self, session_id: &str, original_url: &str) -> Result<bool> {
        let now = Utc::now();
        let pending = Session::new(session_id, "", original_url);

        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.is_authenticated() && !self.is_expired(current, now) {
                    return Ok(false);
                }
                entry.insert(pending);
            }
            Entry::Vacant(entry) => {
                entry.insert(pending);
            }
        }

        Ok(true)
    }

    async fn evict_expired(&self) -> Result<usize> {
        if self.ttl.is_none() {
            return Ok(0);
        }

        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !self.is_expired(session, now));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.sessions.len())
    }
}
