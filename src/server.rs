//!
//! dispo HTTP server
//! -----------------
//! Axum transport around the gates. This module only moves data between HTTP and
//! the core: it reads the session cookie into a `RequestContext`, runs the API or
//! page gate, and turns the outcome into a response.
//!
//! Routes:
//! - `POST /api/login`, `GET /api/status`: exempt API routes.
//! - `POST /api/logout`, `GET /api/me`, `/api/users/{id}`: gated API routes.
//! - `GET /users`: gated page (redirects to login, blocked view below level 9).
//! - `GET /login`: public login page descriptor.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::access::{AccessPolicy, Route};
use crate::config::{ServerConfig, SessionConfig};
use crate::directory::UserDirectory;
use crate::error::{AppError, AppResult};
use crate::gate::{render_for, require_route, ApiGate, Caller, SsrGate};
use crate::identity::{MemorySessionStore, RequestContext};
use crate::redirect::post_login_target;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SessionConfig>,
    pub policy: Arc<AccessPolicy>,
    pub sessions: Arc<MemorySessionStore>,
    pub directory: Arc<UserDirectory>,
    pub api: ApiGate,
    pub pages: SsrGate,
}

impl AppState {
    pub fn new(config: SessionConfig, policy: AccessPolicy, directory: UserDirectory) -> Self {
        let sessions = Arc::new(MemorySessionStore::new(config.ttl));
        let api = ApiGate::new(sessions.clone());
        let pages = SsrGate::new(sessions.clone(), &config);
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            sessions,
            directory: Arc::new(directory),
            api,
            pages,
        }
    }

    fn request_context(&self, headers: &HeaderMap, uri: &Uri) -> RequestContext {
        let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        RequestContext::new(path, parse_cookie(headers, &self.config.cookie_name))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "dispo ok" }))
        .route("/login", get(login_page))
        .route("/users", get(users_page))
        .route("/api/login", post(api_login))
        .route("/api/logout", post(api_logout))
        .route("/api/status", get(api_status))
        .route("/api/me", get(api_me))
        .route("/api/users/{id}", any(api_user))
        .with_state(state)
}

pub async fn run(server: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = server.addr().parse()?;
    info!(target: "dispo::http", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie") {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

fn session_cookie(cfg: &SessionConfig, token: &str) -> AppResult<HeaderValue> {
    let secure = if cfg.secure_cookie { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}={}; HttpOnly{}; SameSite=Lax; Path=/", cfg.cookie_name, token, secure))
        .map_err(|e| AppError::internal("cookie", e.to_string()))
}

fn cleared_cookie(cfg: &SessionConfig) -> AppResult<HeaderValue> {
    let secure = if cfg.secure_cookie { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly{}; SameSite=Lax; Path=/", cfg.cookie_name, secure))
        .map_err(|e| AppError::internal("cookie", e.to_string()))
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
    #[serde(default)]
    redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedirectQuery {
    redirect: Option<String>,
}

async fn login_page(State(state): State<AppState>, Query(q): Query<RedirectQuery>) -> Response {
    // The raw query value is already decoded by the extractor; re-encode for the target check
    let raw = q.redirect.as_deref().map(|r| urlencoding::encode(r).into_owned());
    let target = post_login_target(&state.config.login_path, raw.as_deref());
    Json(json!({"page": "login", "redirect": target})).into_response()
}

async fn do_login(_caller: Caller, (state, payload): (AppState, LoginPayload)) -> AppResult<Response> {
    let Some(user) = state.directory.verify(&payload.username, &payload.password) else {
        return Err(AppError::auth("invalid_credentials", "Benutzername oder Passwort falsch"));
    };
    let session = state.sessions.issue(user.clone())?;
    let raw = payload.redirect.as_deref().map(|r| urlencoding::encode(r).into_owned());
    let target = post_login_target(&state.config.login_path, raw.as_deref());
    info!(target: "dispo::http", user = %user.username, "login");
    let mut resp = Json(json!({"status": "ok", "user": user, "redirect": target})).into_response();
    resp.headers_mut().insert("Set-Cookie", session_cookie(&state.config, &session.token)?);
    Ok(resp)
}

async fn api_login(State(state): State<AppState>, headers: HeaderMap, uri: Uri, Json(payload): Json<LoginPayload>) -> Response {
    let ctx = state.request_context(&headers, &uri);
    state.api.guard_with(do_login, true).call(&ctx, (state.clone(), payload)).await.into_response()
}

async fn do_logout(caller: Caller, state: AppState) -> AppResult<Response> {
    if let Some(session) = caller.session() {
        state.sessions.destroy(&session.token);
    }
    let mut resp = Json(json!({"status": "ok"})).into_response();
    resp.headers_mut().insert("Set-Cookie", cleared_cookie(&state.config)?);
    Ok(resp)
}

async fn api_logout(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let ctx = state.request_context(&headers, &uri);
    state.api.guard(do_logout).call(&ctx, state.clone()).await.into_response()
}

async fn api_status(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let ctx = state.request_context(&headers, &uri);
    let status = |_c: Caller, _: ()| async { Ok::<_, AppError>(Json(json!({"status": "ok"}))) };
    state.api.guard_with(status, true).call(&ctx, ()).await.into_response()
}

async fn do_me(caller: Caller, state: AppState) -> AppResult<Json<serde_json::Value>> {
    let session = caller.session().ok_or_else(AppError::authentication_required)?;
    let user = session.authenticated_user().ok_or_else(AppError::authentication_required)?;
    Ok(Json(json!({
        "status": "ok",
        "user": user,
        "label": state.policy.label_for(user.access),
        "expiresAt": session.expires_at,
    })))
}

async fn api_me(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let ctx = state.request_context(&headers, &uri);
    state.api.guard(do_me).call(&ctx, state.clone()).await.into_response()
}

async fn do_user(caller: Caller, (state, method, id): (AppState, Method, String)) -> AppResult<Json<serde_json::Value>> {
    if method != Method::GET {
        return Err(AppError::method_not_allowed(method.as_str(), &["GET"]));
    }
    require_route(&state.policy, &caller, Route::Users)?;
    let id = id.parse::<u64>().map_err(|_| AppError::user("bad_id", format!("ungültige id '{}'", id)))?;
    let user = state.directory.get(id).ok_or_else(|| AppError::not_found("user_not_found", format!("Benutzer {} nicht gefunden", id)))?;
    Ok(Json(json!({"status": "ok", "data": user})))
}

async fn api_user(State(state): State<AppState>, method: Method, headers: HeaderMap, uri: Uri, Path(id): Path<String>) -> Response {
    let ctx = state.request_context(&headers, &uri);
    state.api.guard(do_user).call(&ctx, (state.clone(), method, id)).await.into_response()
}

async fn users_page(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let ctx = state.request_context(&headers, &uri);
    let policy = state.policy.clone();
    let directory = state.directory.clone();
    let loaded = state
        .pages
        .guard()
        .load_with(&ctx, move |user| async move {
            render_for(&policy, user, Route::Users, move |_u| async move { Ok(directory.list()) }).await
        })
        .await;
    match loaded {
        Ok(result) => result.into_response(),
        Err(e) => e.into_response(),
    }
}
