//! Process-level configuration, read once at startup from the environment and
//! command line, then handed to the server state explicitly.

use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::redirect::DEFAULT_LOGIN_PATH;

pub const DEFAULT_HTTP_PORT: u16 = 7878;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl: Duration,
    pub secure_cookie: bool,
    pub login_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "dispo_session".to_string(),
            ttl: Duration::from_secs(60 * 60 * 8),
            secure_cookie: true,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl SessionConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> AppResult<Self> {
        let mut cfg = Self::default();
        if let Some(v) = get("DISPO_SESSION_COOKIE") { cfg.cookie_name = v; }
        if let Some(v) = get("DISPO_SESSION_TTL_SECS") {
            let secs = v.trim().parse::<u64>()
                .map_err(|_| AppError::config("session_ttl", format!("DISPO_SESSION_TTL_SECS is not a number: '{}'", v)))?;
            cfg.ttl = Duration::from_secs(secs);
        }
        if let Some(v) = get("DISPO_SECURE_COOKIE") {
            cfg.secure_cookie = parse_bool(&v)
                .ok_or_else(|| AppError::config("secure_cookie", format!("DISPO_SECURE_COOKIE is not a boolean: '{}'", v)))?;
        }
        if let Some(v) = get("DISPO_LOGIN_PATH") { cfg.login_path = v; }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        let bad_cookie = self.cookie_name.is_empty()
            || self.cookie_name.chars().any(|c| c == '=' || c == ';' || c == ',' || c.is_whitespace());
        if bad_cookie {
            return Err(AppError::config("session_cookie", format!("invalid cookie name '{}'", self.cookie_name)));
        }
        if self.ttl.is_zero() {
            return Err(AppError::config("session_ttl", "session ttl must be positive"));
        }
        if !self.login_path.starts_with('/') || self.login_path.starts_with("//") || self.login_path.contains('?') {
            return Err(AppError::config("login_path", format!("login path must be a plain absolute path: '{}'", self.login_path)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { bind: "0.0.0.0".to_string(), http_port: DEFAULT_HTTP_PORT } }
}

fn parse_flag<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

impl ServerConfig {
    /// Flags win over environment; environment wins over defaults.
    pub fn from_args_and_lookup<F: Fn(&str) -> Option<String>>(args: &[String], get: F) -> AppResult<Self> {
        let mut cfg = Self::default();
        if let Some(b) = parse_flag(args, "--bind").map(str::to_string).or_else(|| get("DISPO_BIND")) {
            cfg.bind = b;
        }
        let port = parse_flag(args, "--port").map(str::to_string).or_else(|| get("DISPO_HTTP_PORT"));
        if let Some(p) = port {
            cfg.http_port = p.trim().parse::<u16>()
                .map_err(|_| AppError::config("http_port", format!("invalid port '{}'", p)))?;
        }
        Ok(cfg)
    }

    pub fn addr(&self) -> String { format!("{}:{}", self.bind, self.http_port) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| m.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.login_path, "/login");
    }

    #[test]
    fn env_overrides() {
        let cfg = SessionConfig::from_lookup(lookup(&[
            ("DISPO_SESSION_COOKIE", "sid"),
            ("DISPO_SESSION_TTL_SECS", "90"),
            ("DISPO_SECURE_COOKIE", "off"),
            ("DISPO_LOGIN_PATH", "/anmelden"),
        ])).unwrap();
        assert_eq!(cfg.cookie_name, "sid");
        assert_eq!(cfg.ttl, Duration::from_secs(90));
        assert!(!cfg.secure_cookie);
        assert_eq!(cfg.login_path, "/anmelden");
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        for pairs in [
            vec![("DISPO_SESSION_TTL_SECS", "soon")],
            vec![("DISPO_SESSION_TTL_SECS", "0")],
            vec![("DISPO_SECURE_COOKIE", "maybe")],
            vec![("DISPO_SESSION_COOKIE", "a b")],
            vec![("DISPO_LOGIN_PATH", "login")],
            vec![("DISPO_LOGIN_PATH", "//evil.example")],
        ] {
            let err = SessionConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, AppError::Config { .. }), "{pairs:?}");
        }
    }

    #[test]
    fn server_flags_beat_env() {
        let args: Vec<String> = ["dispo_server", "--port", "9000"].iter().map(|s| s.to_string()).collect();
        let cfg = ServerConfig::from_args_and_lookup(&args, lookup(&[("DISPO_HTTP_PORT", "8000")])).unwrap();
        assert_eq!(cfg.http_port, 9000);
        let cfg = ServerConfig::from_args_and_lookup(&[], lookup(&[("DISPO_HTTP_PORT", "8000")])).unwrap();
        assert_eq!(cfg.http_port, 8000);
        assert_eq!(cfg.addr(), "0.0.0.0:8000");
        assert!(ServerConfig::from_args_and_lookup(&[], lookup(&[("DISPO_HTTP_PORT", "x")])).is_err());
    }
}
