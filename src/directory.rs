//! In-memory user directory backing the login endpoint and the user pages.
//! Passwords are stored as Argon2 PHC strings only.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use serde::Serialize;

use crate::access::AccessLevel;
use crate::identity::User;

/// Argon2id PHC string for `password` with a fresh 128-bit salt.
fn phc_for(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    getrandom::getrandom(&mut salt).map_err(|e| anyhow!("salt generation failed: {e}"))?;
    let salt = SaltString::encode_b64(&salt).map_err(|e| anyhow!("salt encoding failed: {e}"))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// Listing row for the user pages and `/api/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub domain: Option<String>,
    pub access: Option<AccessLevel>,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct UserRecord {
    id: u64,
    user: User,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.user.username.clone(),
            domain: self.user.domain.clone(),
            access: self.user.access,
            region: self.user.region.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Default)]
pub struct UserDirectory {
    users: RwLock<BTreeMap<u64, UserRecord>>,
}

impl UserDirectory {
    pub fn new() -> Self { Self::default() }

    /// Add or replace a user (matched case-insensitively by username). Returns its id.
    pub fn upsert(&self, user: User, password: &str) -> Result<u64> {
        if !user.is_identified() {
            return Err(anyhow!("username must not be empty"));
        }
        let password_hash = phc_for(password)?;
        let now = Utc::now();
        let mut users = self.users.write();
        let existing = users.values().find(|r| r.user.username.eq_ignore_ascii_case(&user.username)).map(|r| (r.id, r.created_at));
        let (id, created_at) = existing.unwrap_or_else(|| (users.keys().next_back().map(|k| k + 1).unwrap_or(1), now));
        users.insert(id, UserRecord { id, user, password_hash, created_at, updated_at: now });
        Ok(id)
    }

    /// Verify credentials; the stored user on success.
    pub fn verify(&self, username: &str, password: &str) -> Option<User> {
        let users = self.users.read();
        let rec = users.values().find(|r| r.user.username.eq_ignore_ascii_case(username))?;
        // An unparseable stored hash never authenticates
        let phc = PasswordHash::new(&rec.password_hash).ok()?;
        Argon2::default().verify_password(password.as_bytes(), &phc).ok()?;
        Some(rec.user.clone())
    }

    pub fn get(&self, id: u64) -> Option<UserSummary> {
        self.users.read().get(&id).map(UserRecord::summary)
    }

    pub fn list(&self) -> Vec<UserSummary> {
        self.users.read().values().map(UserRecord::summary).collect()
    }
}
