use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FailureKind, UserId};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StashError>;

/// Errors raised by the store and lock layers.
#[derive(Debug, Error)]
pub enum StashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock unavailable: {0}")]
    Lock(String),

    #[error("timed out after {waited_ms}ms waiting for master lock on {path}")]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("no stash metadata found at {path}")]
    MissingMetadata { path: PathBuf },

    #[error("stash already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("corrupt stash metadata at {path}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("stash metadata checksum mismatch at {path}")]
    ChecksumMismatch { path: PathBuf },

    #[error("unsupported stash metadata version {found}")]
    UnsupportedVersion { found: u32 },

    #[error("payload segment {name} is missing or truncated")]
    MissingSegment { name: String },

    #[error("store handle is not bound to a directory")]
    UnboundStore,

    #[error("username '{username}' is already in use")]
    UsernameTaken { username: String },

    #[error("no user with id {user_id}")]
    UnknownUser { user_id: UserId },

    #[error("invalid username: {reason}")]
    InvalidUsername { reason: &'static str },

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),
}

impl StashError {
    /// Project a library error onto the provisioning failure taxonomy.
    ///
    /// `context` decides how a plain I/O error is read: while loading the
    /// namespace it means the store is unreadable, afterwards it means the
    /// write did not land.
    #[must_use]
    pub fn failure_kind(&self, context: FailureKind) -> FailureKind {
        match self {
            Self::Lock(_) | Self::LockTimeout { .. } => FailureKind::LockUnavailable,
            Self::MissingMetadata { .. }
            | Self::CorruptMetadata { .. }
            | Self::ChecksumMismatch { .. }
            | Self::UnsupportedVersion { .. }
            | Self::MissingSegment { .. }
            | Self::Serialization(_) => FailureKind::StoreUnreadable,
            Self::InvalidUsername { .. } | Self::AlreadyInitialized { .. } => {
                FailureKind::InvalidRequest
            }
            Self::InternalInvariant(_) | Self::UnboundStore => FailureKind::Internal,
            Self::Io(_)
            | Self::UsernameTaken { .. }
            | Self::UnknownUser { .. }
            | Self::PasswordHash(_) => context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_errors_map_to_lock_unavailable() {
        let err = StashError::LockTimeout {
            path: PathBuf::from("/tmp/stash"),
            waited_ms: 10,
        };
        assert_eq!(
            err.failure_kind(FailureKind::StoreWriteFailed),
            FailureKind::LockUnavailable
        );
    }

    #[test]
    fn io_errors_follow_context() {
        let err = StashError::Io(std::io::Error::other("disk full"));
        assert_eq!(
            err.failure_kind(FailureKind::StoreWriteFailed),
            FailureKind::StoreWriteFailed
        );
        assert_eq!(
            err.failure_kind(FailureKind::StoreUnreadable),
            FailureKind::StoreUnreadable
        );
    }
}
