use super::SessionToken;

/// Per-request input to the gates. Built by the transport layer from the cookie
/// and the request URI; nothing downstream mutates it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session_token: Option<SessionToken>,
    /// Path and query as requested, e.g. `/users/5?tab=stations`.
    pub path: String,
    pub request_id: String,
}

impl RequestContext {
    pub fn new<S: Into<String>>(path: S, session_token: Option<SessionToken>) -> Self {
        Self { session_token, path: path.into(), request_id: uuid::Uuid::new_v4().to_string() }
    }
}

impl Default for RequestContext {
    fn default() -> Self { Self::new("/", None) }
}
