//! Shared fixtures for the gate tests: a scripted session store that records
//! every call it receives.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use dispo_admin::access::AccessLevel;
use dispo_admin::identity::{RequestContext, Session, SessionStore, StoreError, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read,
    Save,
    Handler,
    Props,
}

/// Ordered log shared between the store and the handlers under test.
#[derive(Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<Op>>>);

impl OpLog {
    pub fn push(&self, op: Op) { self.0.lock().push(op); }
    pub fn ops(&self) -> Vec<Op> { self.0.lock().clone() }
    pub fn count(&self, op: &Op) -> usize { self.0.lock().iter().filter(|o| *o == op).count() }
}

pub struct ScriptedStore {
    pub log: OpLog,
    pub session: Option<Session>,
    pub fail_read: bool,
    pub fail_save: bool,
    /// Simulates a logout that lands between the gate's read and its save.
    pub lose_before_save: bool,
}

impl ScriptedStore {
    pub fn empty(log: &OpLog) -> Self {
        Self { log: log.clone(), session: None, fail_read: false, fail_save: false, lose_before_save: false }
    }

    pub fn with_user(log: &OpLog, user: Option<User>) -> Self {
        let now = Utc::now();
        let session = Session { token: "tok".into(), user, issued_at: now, expires_at: now + Duration::minutes(5) };
        Self { log: log.clone(), session: Some(session), fail_read: false, fail_save: false, lose_before_save: false }
    }
}

#[async_trait]
impl SessionStore for ScriptedStore {
    async fn read(&self, _ctx: &RequestContext) -> Result<Option<Session>, StoreError> {
        self.log.push(Op::Read);
        if self.fail_read {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        Ok(self.session.clone())
    }

    async fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        self.log.push(Op::Save);
        if self.fail_save {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        if self.lose_before_save {
            return Err(StoreError::Gone);
        }
        session.expires_at = Utc::now() + Duration::hours(1);
        Ok(())
    }
}

pub fn user(name: &str, level: i32) -> User {
    User::new(name, AccessLevel(level))
}

pub fn ctx(path: &str) -> RequestContext {
    RequestContext::new(path, Some("tok".to_string()))
}
