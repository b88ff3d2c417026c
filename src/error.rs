//! Unified application error model and mapping helpers.
//! Every handler failure, gate rejection included, leaves the server through the
//! same JSON envelope so callers only tell failures apart by status and message.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::access::PolicyError;
use crate::identity::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    MethodNotAllowed { code: String, message: String, allowed: Vec<String> },
    Auth { code: String, message: String },
    Config { code: String, message: String },
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::MethodNotAllowed { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Config { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::MethodNotAllowed { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Config { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn config<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn storage<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The rejection emitted by the API gate when no authenticated user is present.
    pub fn authentication_required() -> Self {
        AppError::auth("authentication_required", "Authentifizierung erforderlich")
    }

    /// Authenticated caller below the level an API route requires.
    pub fn insufficient_access() -> Self {
        AppError::auth("insufficient_access", "Keine Berechtigung")
    }

    /// Unsupported HTTP method; `allowed` ends up in the `Allow` header.
    pub fn method_not_allowed(method: &str, allowed: &[&str]) -> Self {
        AppError::MethodNotAllowed {
            code: "method_not_allowed".into(),
            message: format!("Methode {} nicht erlaubt", method),
            allowed: allowed.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::MethodNotAllowed { .. } => 405,
            AppError::Auth { .. } => 403,
            AppError::Config { .. } => 500,
            AppError::Storage { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    pub fn is_auth(&self) -> bool { matches!(self, AppError::Auth { .. }) }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage { code: "session_store".into(), message: err.to_string() }
    }
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        AppError::Config { code: "access_policy".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Server faults keep their detail in the logs, not on the wire
        let message = match self {
            AppError::Config { .. } | AppError::Storage { .. } | AppError::Internal { .. } => {
                tracing::error!(target: "dispo::http", code = self.code_str(), "request failed: {}", self.message());
                "Interner Serverfehler".to_string()
            }
            _ => self.message().to_string(),
        };
        let body = Json(serde_json::json!({"status": "error", "code": self.code_str(), "error": message}));
        let mut resp = (status, body).into_response();
        if let AppError::MethodNotAllowed { allowed, .. } = &self {
            if let Ok(v) = HeaderValue::from_str(&allowed.join(", ")) {
                resp.headers_mut().insert(header::ALLOW, v);
            }
        }
        resp
    }
}
