use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::{RequestContext, SessionStore, StoreError, User};

pub type SessionToken = String;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub token: SessionToken,
    pub user: Option<User>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// The session's user, if it names a real identity.
    pub fn authenticated_user(&self) -> Option<&User> {
        self.user.as_ref().filter(|u| u.is_identified())
    }
}

fn gen_token() -> Result<SessionToken, StoreError> {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

fn ttl_delta(ttl: Duration) -> chrono::Duration {
    // Out-of-range TTLs are clamped to a century
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

fn unindex(index: &mut HashMap<String, HashSet<SessionToken>>, username: &str, token: &str) {
    if let Some(set) = index.get_mut(username) {
        set.remove(token);
        if set.is_empty() {
            index.remove(username);
        }
    }
}

/// In-process session store with sliding expiry.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    user_index: RwLock<HashMap<String, HashSet<SessionToken>>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()), user_index: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Create a session for a freshly logged-in user. Expired sessions are
    /// swept first.
    pub fn issue(&self, user: User) -> Result<Session, StoreError> {
        let now = Utc::now();
        self.purge_expired(now);
        let token = gen_token()?;
        let session = Session { token: token.clone(), user: Some(user.clone()), issued_at: now, expires_at: now + ttl_delta(self.ttl) };
        self.sessions.write().insert(token.clone(), session.clone());
        self.user_index.write().entry(user.username.clone()).or_default().insert(token);
        tracing::debug!(target: "dispo::session", user = %user.username, ttl_secs = self.ttl.as_secs(), "session.issue");
        Ok(session)
    }

    /// Drop every session that expired at or before `now`. Returns how many went.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let expired: Vec<Session> = sessions.values().filter(|s| s.expires_at <= now).cloned().collect();
        if expired.is_empty() {
            return 0;
        }
        let mut index = self.user_index.write();
        for sess in &expired {
            sessions.remove(&sess.token);
            if let Some(user) = &sess.user {
                unindex(&mut index, &user.username, &sess.token);
            }
        }
        tracing::debug!(target: "dispo::session", count = expired.len(), "session.purge");
        expired.len()
    }

    pub fn destroy(&self, token: &str) -> bool {
        let Some(sess) = self.sessions.write().remove(token) else { return false; };
        if let Some(user) = sess.user {
            unindex(&mut self.user_index.write(), &user.username, token);
        }
        true
    }

    pub fn revoke_user(&self, username: &str) -> usize {
        let Some(tokens) = self.user_index.write().remove(username) else { return 0; };
        let mut sessions = self.sessions.write();
        let count = tokens.iter().filter(|t| sessions.remove(*t).is_some()).count();
        tracing::debug!(target: "dispo::session", user = %username, count, "session.revoke");
        count
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read(&self, ctx: &RequestContext) -> Result<Option<Session>, StoreError> {
        let Some(token) = ctx.session_token.as_deref() else { return Ok(None); };
        let now = Utc::now();
        let found = self.sessions.read().get(token).cloned();
        match found {
            Some(sess) if sess.expires_at > now => Ok(Some(sess)),
            Some(_) => {
                self.destroy(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        let mut map = self.sessions.write();
        // A destroyed or revoked session cannot be revived by renewal
        let Some(stored) = map.get_mut(&session.token) else {
            return Err(StoreError::Gone);
        };
        session.expires_at = Utc::now() + ttl_delta(self.ttl);
        *stored = session.clone();
        tracing::debug!(target: "dispo::session", expires_at = %session.expires_at, "session.renew");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;

    fn ctx(token: &str) -> RequestContext { RequestContext::new("/", Some(token.to_string())) }

    #[tokio::test]
    async fn issue_then_read() {
        let store = MemorySessionStore::default();
        let s = store.issue(User::new("mmeier", AccessLevel(4))).unwrap();
        let got = store.read(&ctx(&s.token)).await.unwrap().unwrap();
        assert_eq!(got.user.unwrap().username, "mmeier");
    }

    #[tokio::test]
    async fn read_without_token_or_unknown_token() {
        let store = MemorySessionStore::default();
        assert!(store.read(&RequestContext::default()).await.unwrap().is_none());
        assert!(store.read(&ctx("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped_on_read() {
        let store = MemorySessionStore::new(Duration::ZERO);
        let s = store.issue(User::new("mmeier", AccessLevel(0))).unwrap();
        assert!(store.read(&ctx(&s.token)).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn save_extends_expiry_and_is_visible_to_read() {
        let store = MemorySessionStore::default();
        let mut s = store.issue(User::new("mmeier", AccessLevel(0))).unwrap();
        let before = s.expires_at;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save(&mut s).await.unwrap();
        assert!(s.expires_at > before);
        let got = store.read(&ctx(&s.token)).await.unwrap().unwrap();
        assert_eq!(got.expires_at, s.expires_at);
    }

    #[tokio::test]
    async fn save_after_destroy_fails() {
        let store = MemorySessionStore::default();
        let mut s = store.issue(User::new("mmeier", AccessLevel(0))).unwrap();
        assert!(store.destroy(&s.token));
        assert_eq!(store.save(&mut s).await.unwrap_err(), StoreError::Gone);
    }

    #[tokio::test]
    async fn issue_sweeps_expired_sessions() {
        let store = MemorySessionStore::new(Duration::from_millis(1));
        for i in 0..50 {
            store.issue(User::new(format!("u{}", i % 5), AccessLevel(0))).unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.issue(User::new("fresh", AccessLevel(0))).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.user_index.read().len(), 1);
    }

    #[test]
    fn index_entries_go_with_their_last_session() {
        let store = MemorySessionStore::default();
        let a = store.issue(User::new("a", AccessLevel(0))).unwrap();
        store.issue(User::new("b", AccessLevel(0))).unwrap();
        assert!(store.destroy(&a.token));
        assert!(!store.user_index.read().contains_key("a"));
        assert_eq!(store.revoke_user("b"), 1);
        assert!(store.user_index.read().is_empty());
    }

    #[test]
    fn revoke_user_drops_every_session() {
        let store = MemorySessionStore::default();
        store.issue(User::new("a", AccessLevel(0))).unwrap();
        store.issue(User::new("a", AccessLevel(0))).unwrap();
        store.issue(User::new("b", AccessLevel(0))).unwrap();
        assert_eq!(store.revoke_user("a"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.revoke_user("a"), 0);
    }

    #[test]
    fn authenticated_user_requires_username() {
        let now = Utc::now();
        let s = Session { token: "t".into(), user: Some(User::new("", AccessLevel(9))), issued_at: now, expires_at: now };
        assert!(s.authenticated_user().is_none());
    }
}
