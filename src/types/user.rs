//! User identities as seen by the provisioning core.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_USERNAME_BYTES;

/// Backend-assigned user id. Zero is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(NonZeroU64);

impl UserId {
    /// Wrap a raw id reported by a backend; `None` when the backend handed out zero.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user that exists in some namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_set: bool,
}

/// Why `username` cannot name a user, or `None` when it can.
pub(crate) fn username_problem(username: &str) -> Option<&'static str> {
    if username.is_empty() {
        Some("empty")
    } else if username.len() > MAX_USERNAME_BYTES {
        Some("longer than 64 bytes")
    } else if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("contains whitespace or control characters")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_user_id() {
        assert!(UserId::new(0).is_none());
        assert_eq!(UserId::new(7).map(UserId::get), Some(7));
    }

    #[test]
    fn zero_fails_to_deserialize() {
        assert!(serde_json::from_str::<UserId>("0").is_err());
        let id: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn username_format() {
        assert_eq!(username_problem("alice"), None);
        assert_eq!(username_problem(""), Some("empty"));
        assert!(username_problem("bad name").is_some());
        assert!(username_problem("tab\there").is_some());
        assert!(username_problem(&"x".repeat(MAX_USERNAME_BYTES)).is_none());
        assert!(username_problem(&"x".repeat(MAX_USERNAME_BYTES + 1)).is_some());
    }
}
