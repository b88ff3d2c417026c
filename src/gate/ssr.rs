use std::future::Future;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{RequestContext, SessionStore, User};
use crate::redirect::build_login_redirect;

/// Instruction to send the browser elsewhere instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

/// Result of a page props loader: render with these props, or redirect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropsResult<P> {
    Props(P),
    Redirect(Redirect),
}

impl<P> PropsResult<P> {
    pub fn props(self) -> Option<P> {
        match self {
            PropsResult::Props(p) => Some(p),
            PropsResult::Redirect(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            PropsResult::Props(_) => None,
            PropsResult::Redirect(r) => Some(r),
        }
    }
}

impl<P: Serialize> IntoResponse for PropsResult<P> {
    fn into_response(self) -> Response {
        match self {
            PropsResult::Props(p) => Json(p).into_response(),
            PropsResult::Redirect(r) if r.permanent => axum::response::Redirect::permanent(&r.destination).into_response(),
            PropsResult::Redirect(r) => axum::response::Redirect::temporary(&r.destination).into_response(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProps {
    pub user: User,
}

/// Session gate for server-rendered pages.
#[derive(Clone)]
pub struct SsrGate {
    store: Arc<dyn SessionStore>,
    login_path: String,
}

impl SsrGate {
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self { store, login_path: config.login_path.clone() }
    }

    pub fn guard(&self) -> PropsLoader {
        PropsLoader { store: self.store.clone(), login_path: self.login_path.clone() }
    }
}

/// Props loader produced by `SsrGate::guard`, run before a page renders.
#[derive(Clone)]
pub struct PropsLoader {
    store: Arc<dyn SessionStore>,
    login_path: String,
}

impl PropsLoader {
    /// The signed-in user as props.
    pub async fn load(&self, ctx: &RequestContext) -> AppResult<PropsResult<UserProps>> {
        self.load_with(ctx, |user| async move { Ok(UserProps { user }) }).await
    }

    /// Resolve the user, then build page props with `props`. `props` is only
    /// evaluated for an authenticated user. The session is not renewed here.
    pub async fn load_with<P, F, Fut>(&self, ctx: &RequestContext, props: F) -> AppResult<PropsResult<P>>
    where
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = AppResult<P>>,
    {
        let session = self.store.read(ctx).await.map_err(|e| {
            warn!(target: "dispo::gate", request_id = %ctx.request_id, "session read failed: {e}");
            AppError::from(e)
        })?;
        let user = session.and_then(|s| s.authenticated_user().cloned());
        let Some(user) = user else {
            let destination = build_login_redirect(&self.login_path, &ctx.path);
            debug!(target: "dispo::gate", request_id = %ctx.request_id, path = %ctx.path, %destination, "page gate: redirect to login");
            return Ok(PropsResult::Redirect(Redirect { destination, permanent: false }));
        };
        Ok(PropsResult::Props(props(user).await?))
    }
}
