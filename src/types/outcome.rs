//! The tri-state result every provisioner produces.

use std::fmt;

use crate::remote::ResultCode;

use super::user::UserId;

/// Why a provisioning attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed request, rejected before any I/O.
    InvalidRequest,
    /// The master lock of a local store could not be taken.
    LockUnavailable,
    /// Store metadata is missing, corrupt or unreadable.
    StoreUnreadable,
    /// The new record could not be persisted.
    StoreWriteFailed,
    /// No session could be established with the running instance.
    ConnectionFailed { code: ResultCode },
    /// The running instance refused a request.
    RemoteError { code: ResultCode },
    /// The user exists but its password was not set.
    PasswordSetFailed { user_id: UserId },
    /// A backend broke its own contract, e.g. reported success with a zero id.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => f.write_str("invalid request"),
            Self::LockUnavailable => f.write_str("lock unavailable"),
            Self::StoreUnreadable => f.write_str("store unreadable"),
            Self::StoreWriteFailed => f.write_str("store write failed"),
            Self::ConnectionFailed { code } => write!(f, "connection failed ({code})"),
            Self::RemoteError { code } => write!(f, "remote error ({code})"),
            Self::PasswordSetFailed { user_id } => {
                write!(f, "password not set for user id {user_id}")
            }
            Self::Internal => f.write_str("internal error"),
        }
    }
}

/// Result of one provisioning attempt.
///
/// A conflict is an expected answer, not an error, which is why it is its
/// own variant rather than a [`FailureKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { user_id: UserId },
    Conflict { username: String },
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn failed<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when the account exists but is not fully usable.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                kind: FailureKind::PasswordSetFailed { .. },
                ..
            }
        )
    }

    /// Id of the account this attempt left behind, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Created { user_id }
            | Self::Failed {
                kind: FailureKind::PasswordSetFailed { user_id },
                ..
            } => Some(*user_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { user_id } => write!(f, "user created with id {user_id}"),
            Self::Conflict { username } => write!(f, "Username '{username}' is already in use."),
            Self::Failed {
                kind: FailureKind::ConnectionFailed { code },
                ..
            } => write!(f, "Unable to connect: {code}"),
            Self::Failed {
                kind: FailureKind::RemoteError { code },
                ..
            } => write!(f, "Unexpected error: {code}"),
            Self::Failed {
                kind: FailureKind::PasswordSetFailed { user_id },
                message,
            } => write!(
                f,
                "user created with id {user_id} but the password was not set: {message}"
            ),
            Self::Failed { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_success_keeps_user_id() {
        let user_id = UserId::new(12).unwrap();
        let outcome = Outcome::failed(FailureKind::PasswordSetFailed { user_id }, "disk full");
        assert!(outcome.is_partial());
        assert_eq!(outcome.user_id(), Some(user_id));
        assert!(outcome.to_string().contains("id 12"));
    }

    #[test]
    fn remote_codes_render_in_hex() {
        let outcome = Outcome::failed(
            FailureKind::ConnectionFailed {
                code: ResultCode::CONNECT_FAILED,
            },
            "refused",
        );
        assert!(outcome.to_string().starts_with("Unable to connect: 0002:"));
        assert_eq!(outcome.user_id(), None);
    }
}
