//! Server-side session state
//!
//! In-memory storage for login sessions with TTL support. Records are keyed
//! by an opaque session id carried in a cookie; they are created whole at
//! login, removed whole at logout, and never partially updated.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Role;

/// One authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    /// Bearer token issued by the identity API at login.
    pub access_token: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session is still within its lifetime.
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Per-request view of session state, resolved once at the top of the
/// request and threaded into every handler. A context without a live
/// session is anonymous.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Session id from the request cookie, if any (kept so logout can clear
    /// a stale cookie even when the record is already gone).
    pub session_id: Option<Uuid>,
    pub session: Option<Session>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            session_id: Some(session.session_id),
            session: Some(session),
        }
    }

    /// Role of the current session. A record without a token never
    /// authenticates, whatever else it claims.
    pub fn role(&self) -> Option<Role> {
        self.session
            .as_ref()
            .filter(|s| !s.access_token.is_empty())
            .map(|s| s.role)
    }

    /// Bearer token for upstream calls, read once per request.
    pub fn token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }
}

/// Session store with concurrent access. Records for different session ids
/// are independent; last write wins for concurrent login/logout on the same
/// id (duplicate tabs).
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Create a fresh session for a completed login. Always a full record
    /// under a new id; no partial state is ever committed.
    pub fn create(&self, username: &str, role: Role, access_token: String) -> Session {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4(),
            access_token,
            username: username.to_string(),
            role,
            created_at: now,
            expires_at: now + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
        };
        self.sessions.insert(session.session_id, session.clone());
        session
    }

    /// Resolve the request's session context from its cookie id. Expired
    /// records resolve to anonymous and are dropped on the spot.
    pub fn resolve(&self, session_id: Option<Uuid>) -> SessionContext {
        let id = match session_id {
            Some(id) => id,
            None => return SessionContext::anonymous(),
        };

        let session = self.sessions.get(&id).map(|s| s.clone());
        match session {
            Some(s) if s.is_valid() => SessionContext {
                session_id: Some(id),
                session: Some(s),
            },
            Some(_) => {
                self.sessions.remove(&id);
                SessionContext {
                    session_id: Some(id),
                    session: None,
                }
            }
            None => SessionContext {
                session_id: Some(id),
                session: None,
            },
        }
    }

    /// Clear a session. Idempotent: removing an absent record is a no-op.
    pub fn remove(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
    }

    /// Drop expired records, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.is_valid());
        before - self.sessions.len()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Spawn a background task to periodically drop expired sessions.
pub fn spawn_cleanup_task(store: Arc<SessionStore>) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(60);
        loop {
            tokio::time::sleep(interval).await;
            let removed = store.cleanup();
            if removed > 0 {
                debug!("Session cleanup: removed {} expired sessions", removed);
            }
            debug!("Session stats: {} active", store.active_count());
        }
    });
    info!("Session cleanup task started");
}
