//!
//! dispo server binary
//! -------------------
//! Command-line entry point for the dispo administration backend. Configuration
//! comes from CLI flags and environment variables; see `--help`.

use anyhow::{Context, Result};
use std::env;

use dispo_admin::access::{AccessLevel, AccessPolicy};
use dispo_admin::config::{ServerConfig, SessionConfig};
use dispo_admin::directory::UserDirectory;
use dispo_admin::identity::User;
use dispo_admin::server::{self, AppState};

const DEFAULT_ADMIN: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "dispo";

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Seed the bootstrap administrator so a fresh instance can be logged into.
fn ensure_default_admin(directory: &UserDirectory) -> Result<()> {
    let username = env::var("DISPO_ADMIN_USER").unwrap_or_else(|_| DEFAULT_ADMIN.to_string());
    let password = match env::var("DISPO_ADMIN_PASSWORD") {
        Ok(p) => p,
        Err(_) => {
            tracing::warn!("DISPO_ADMIN_PASSWORD not set; seeding '{}' with the built-in default password", username);
            DEFAULT_ADMIN_PASSWORD.to_string()
        }
    };
    directory
        .upsert(User::new(username.clone(), AccessLevel::ADMIN), &password)
        .with_context(|| format!("While seeding administrator '{}'", username))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("dispo server\n\nUSAGE:\n  dispo_server [--port N] [--bind ADDR]\n\nOPTIONS:\n  --port N        HTTP port (env: DISPO_HTTP_PORT, default 7878)\n  --bind ADDR     Bind address (env: DISPO_BIND, default 0.0.0.0)\n\nENVIRONMENT:\n  DISPO_SESSION_COOKIE, DISPO_SESSION_TTL_SECS, DISPO_SECURE_COOKIE, DISPO_LOGIN_PATH,\n  DISPO_ADMIN_USER, DISPO_ADMIN_PASSWORD, RUST_LOG\n");
        return Ok(());
    }

    let server_cfg = ServerConfig::from_args_and_lookup(&args, |k| env::var(k).ok())?;
    let session_cfg = SessionConfig::from_env()?;
    // A broken policy table must stop startup, never degrade to allow-all
    let policy = AccessPolicy::standard().context("access policy table is inconsistent")?;
    for (route, level) in policy.routes() {
        tracing::debug!(target: "dispo::access", route = %route, level = %level, label = policy.label_for(Some(level)), "route policy");
    }

    let directory = UserDirectory::new();
    ensure_default_admin(&directory)?;

    tracing::info!(
        target: "dispo",
        "dispo starting: addr={}, cookie='{}', ttl_secs={}, login_path='{}'",
        server_cfg.addr(), session_cfg.cookie_name, session_cfg.ttl.as_secs(), session_cfg.login_path
    );
    server::run(server_cfg, AppState::new(session_cfg, policy, directory)).await
}
