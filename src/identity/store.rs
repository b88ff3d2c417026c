use async_trait::async_trait;
use thiserror::Error;

use super::{RequestContext, Session};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session record unreadable: {0}")]
    Corrupt(String),
    /// The session was destroyed or revoked after it was read.
    #[error("session no longer exists")]
    Gone,
}

/// Session persistence consumed by the gates.
///
/// `read` must observe the latest `save` made during the same request. The
/// gates issue at most one of each per request.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read(&self, ctx: &RequestContext) -> Result<Option<Session>, StoreError>;

    /// Persist and renew. The store refreshes `session.expires_at` in place.
    /// A session removed since `read` yields `StoreError::Gone`, not a fault.
    async fn save(&self, session: &mut Session) -> Result<(), StoreError>;
}
