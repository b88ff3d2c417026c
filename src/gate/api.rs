use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::access::{AccessPolicy, AuthzDecision, Route};
use crate::error::{AppError, AppResult};
use crate::identity::{RequestContext, Session, SessionStore, StoreError, User};

/// What a guarded API handler knows about its caller.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Authenticated; the session has already been renewed.
    Session(Session),
    /// Exempt route. No session was read.
    Anonymous,
}

impl Caller {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Caller::Session(s) => Some(s),
            Caller::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().and_then(|s| s.authenticated_user())
    }
}

/// Session gate for API handlers.
#[derive(Clone)]
pub struct ApiGate {
    store: Arc<dyn SessionStore>,
}

impl ApiGate {
    pub fn new(store: Arc<dyn SessionStore>) -> Self { Self { store } }

    /// Wrap a handler that requires an authenticated session.
    pub fn guard<H>(&self, handler: H) -> Guarded<H> {
        self.guard_with(handler, false)
    }

    /// Wrap a handler; `exempt` handlers run without any session lookup.
    pub fn guard_with<H>(&self, handler: H, exempt: bool) -> Guarded<H> {
        Guarded { store: self.store.clone(), handler, exempt }
    }

    pub async fn authenticate(&self, ctx: &RequestContext) -> AppResult<Session> {
        authenticate(self.store.as_ref(), ctx).await
    }
}

/// read → decide → renew. Renewal happens before any handler runs.
async fn authenticate(store: &dyn SessionStore, ctx: &RequestContext) -> AppResult<Session> {
    let session = store.read(ctx).await.map_err(|e| {
        warn!(target: "dispo::gate", request_id = %ctx.request_id, "session read failed: {e}");
        AppError::from(e)
    })?;
    let Some(mut session) = session.filter(|s| s.authenticated_user().is_some()) else {
        debug!(target: "dispo::gate", request_id = %ctx.request_id, path = %ctx.path, "api gate: no authenticated user");
        return Err(AppError::authentication_required());
    };
    match store.save(&mut session).await {
        Ok(()) => {}
        Err(StoreError::Gone) => {
            debug!(target: "dispo::gate", request_id = %ctx.request_id, "api gate: session ended before renewal");
            return Err(AppError::authentication_required());
        }
        Err(e) => {
            warn!(target: "dispo::gate", request_id = %ctx.request_id, "session renewal failed: {e}");
            return Err(e.into());
        }
    }
    debug!(target: "dispo::gate", request_id = %ctx.request_id, user = ?session.user.as_ref().map(|u| &u.username), "api gate: renewed");
    Ok(session)
}

/// A handler behind the API gate.
pub struct Guarded<H> {
    store: Arc<dyn SessionStore>,
    handler: H,
    exempt: bool,
}

impl<H> Guarded<H> {
    pub fn is_exempt(&self) -> bool { self.exempt }

    /// Run the gate, then the handler with the resolved caller and `input`.
    pub async fn call<I, T, Fut>(&self, ctx: &RequestContext, input: I) -> AppResult<T>
    where
        H: Fn(Caller, I) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let caller = if self.exempt {
            Caller::Anonymous
        } else {
            Caller::Session(authenticate(self.store.as_ref(), ctx).await?)
        };
        (self.handler)(caller, input).await
    }
}

/// Route-level check for API handlers. An authenticated caller below the
/// required level gets a 403; a policy table defect is a server fault.
pub fn require_route(policy: &AccessPolicy, caller: &Caller, route: Route) -> AppResult<AuthzDecision> {
    let level = caller.user().and_then(|u| u.access);
    let decision = policy.decide(level, route)?;
    if !decision.granted {
        debug!(target: "dispo::gate", route = %route, required = %decision.required_level, actual = ?level, "api route denied");
        return Err(AppError::insufficient_access());
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;
    use crate::identity::MemorySessionStore;

    fn setup(user: User) -> (ApiGate, RequestContext) {
        let store = Arc::new(MemorySessionStore::default());
        let s = store.issue(user).unwrap();
        (ApiGate::new(store), RequestContext::new("/api/me", Some(s.token)))
    }

    #[tokio::test]
    async fn handler_sees_the_session_user() {
        let (gate, ctx) = setup(User::new("mmeier", AccessLevel(2)));
        let h = gate.guard(|caller: Caller, suffix: String| async move {
            Ok::<_, AppError>(format!("{}{}", caller.user().unwrap().username, suffix))
        });
        assert_eq!(h.call(&ctx, "!".to_string()).await.unwrap(), "mmeier!");
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let (gate, ctx) = setup(User::new("", AccessLevel(9)));
        let h = gate.guard(|_c: Caller, _: ()| async { Ok::<_, AppError>(()) });
        assert_eq!(h.call(&ctx, ()).await.unwrap_err(), AppError::authentication_required());
    }

    #[test]
    fn require_route_distinguishes_levels() {
        let policy = AccessPolicy::standard().unwrap();
        let now = chrono::Utc::now();
        let caller = Caller::Session(Session { token: "t".into(), user: Some(User::new("v", AccessLevel(4))), issued_at: now, expires_at: now });
        assert!(require_route(&policy, &caller, Route::StationsNew).is_ok());
        let err = require_route(&policy, &caller, Route::Users).unwrap_err();
        assert_eq!(err, AppError::insufficient_access());
        assert_eq!(require_route(&policy, &Caller::Anonymous, Route::Sessions).unwrap_err(), AppError::insufficient_access());
    }
}
