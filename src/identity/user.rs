use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;

/// The user record carried inside a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub access: Option<AccessLevel>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl User {
    pub fn new<S: Into<String>>(username: S, access: AccessLevel) -> Self {
        Self { username: username.into(), access: Some(access), ..Default::default() }
    }

    /// A blank username is not an identity, whatever the access level says.
    pub fn is_identified(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_usernames_are_not_identities() {
        assert!(User::new("mmeier", AccessLevel(0)).is_identified());
        assert!(!User::new("", AccessLevel(9)).is_identified());
        assert!(!User::new("   ", AccessLevel(9)).is_identified());
    }

    #[test]
    fn missing_access_deserializes_as_none() {
        let u: User = serde_json::from_str(r#"{"username":"jdoe"}"#).unwrap();
        assert_eq!(u.access, None);
        assert!(u.is_identified());
    }
}
