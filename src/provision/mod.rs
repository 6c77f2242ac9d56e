//! The provisioning capability and its dispatcher.
//!
//! Both backends implement [`Provisioner`]: a handful of backend-specific
//! steps driven by one shared pass that owns the outcome mapping.
//!
//! `Start → Locked/Connected → Checked → Created | Conflict → PasswordSet? → End`
//!
//! The pass is linear. Nothing is retried and `finish` runs on every exit.

mod coordinator;
mod local;
mod remote;

pub use coordinator::Coordinator;
pub use local::LocalProvisioner;
pub use remote::RemoteProvisioner;

use crate::types::{FailureKind, Outcome, UserId};

/// A failed backend step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub kind: FailureKind,
    pub message: String,
}

impl StepError {
    pub fn new<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What the create step found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    /// Backend created the user and reported this raw id.
    Created(u64),
    /// The name is already taken in the namespace.
    AlreadyExists,
}

/// One backend's half of provisioning a user.
pub trait Provisioner {
    /// Short backend name for log lines.
    fn backend(&self) -> &'static str;

    fn verbose(&self) -> bool {
        false
    }

    /// Take the lock or establish the session.
    fn begin(&mut self) -> Result<(), StepError>;

    /// Check availability and create the user.
    fn create(&mut self, username: &str) -> Result<Creation, StepError>;

    fn set_password(&mut self, user_id: UserId, password: &str) -> Result<(), StepError>;

    /// Release whatever `begin` acquired. Called on every path, including
    /// when `begin` itself failed half way.
    fn finish(&mut self);

    /// Run the whole pass for `username`.
    fn provision(&mut self, username: &str, password: Option<&str>) -> Outcome
    where
        Self: Sized,
    {
        run(self, username, password)
    }
}

/// Drive `provisioner` through one pass and release its resources.
pub fn run(provisioner: &mut dyn Provisioner, username: &str, password: Option<&str>) -> Outcome {
    let outcome = drive(provisioner, username, password);
    provisioner.finish();
    outcome
}

fn drive(provisioner: &mut dyn Provisioner, username: &str, password: Option<&str>) -> Outcome {
    let backend = provisioner.backend();
    if let Err(err) = provisioner.begin() {
        tracing::debug!(backend, kind = %err.kind, "provisioning could not start");
        return Outcome::failed(err.kind, err.message);
    }

    let raw_id = match provisioner.create(username) {
        Ok(Creation::Created(raw_id)) => raw_id,
        Ok(Creation::AlreadyExists) => {
            tracing::info!(backend, username, "username already in use");
            return Outcome::Conflict {
                username: username.to_string(),
            };
        }
        Err(err) => return Outcome::failed(err.kind, err.message),
    };

    let Some(user_id) = UserId::new(raw_id) else {
        tracing::error!(backend, username, "backend reported success with user id 0");
        return Outcome::failed(
            FailureKind::Internal,
            format!("{backend} backend created '{username}' but reported user id 0"),
        );
    };

    if let Some(password) = password {
        if let Err(err) = provisioner.set_password(user_id, password) {
            tracing::warn!(
                backend,
                username,
                user_id = user_id.get(),
                error = %err.message,
                "user created but password was not set"
            );
            return Outcome::failed(FailureKind::PasswordSetFailed { user_id }, err.message);
        }
    }

    if provisioner.verbose() {
        tracing::info!(backend, username, user_id = user_id.get(), "Username '{username}' created.");
    } else {
        tracing::debug!(backend, username, user_id = user_id.get(), "user created");
    }
    Outcome::Created { user_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ResultCode;

    #[derive(Default)]
    struct Scripted {
        begin: Option<StepError>,
        creation: Option<Result<Creation, StepError>>,
        password: Option<StepError>,
        steps: Vec<&'static str>,
    }

    impl Provisioner for Scripted {
        fn backend(&self) -> &'static str {
            "scripted"
        }

        fn begin(&mut self) -> Result<(), StepError> {
            self.steps.push("begin");
            self.begin.take().map_or(Ok(()), Err)
        }

        fn create(&mut self, _username: &str) -> Result<Creation, StepError> {
            self.steps.push("create");
            self.creation.take().unwrap_or(Ok(Creation::Created(5)))
        }

        fn set_password(&mut self, _user_id: UserId, _password: &str) -> Result<(), StepError> {
            self.steps.push("password");
            self.password.take().map_or(Ok(()), Err)
        }

        fn finish(&mut self) {
            self.steps.push("finish");
        }
    }

    #[test]
    fn full_pass_runs_every_step_once() {
        let mut p = Scripted::default();
        let outcome = p.provision("alice", Some("pw"));
        assert_eq!(outcome.user_id().map(UserId::get), Some(5));
        assert!(outcome.is_created());
        assert_eq!(p.steps, ["begin", "create", "password", "finish"]);
    }

    #[test]
    fn failed_begin_still_finishes() {
        let mut p = Scripted {
            begin: Some(StepError::new(FailureKind::LockUnavailable, "held")),
            ..Default::default()
        };
        let outcome = p.provision("alice", None);
        assert_eq!(outcome.failure_kind(), Some(FailureKind::LockUnavailable));
        assert_eq!(p.steps, ["begin", "finish"]);
    }

    #[test]
    fn existing_name_is_a_conflict_and_skips_password() {
        let mut p = Scripted {
            creation: Some(Ok(Creation::AlreadyExists)),
            ..Default::default()
        };
        let outcome = p.provision("alice", Some("pw"));
        assert_eq!(
            outcome,
            Outcome::Conflict {
                username: "alice".into()
            }
        );
        assert_eq!(p.steps, ["begin", "create", "finish"]);
    }

    #[test]
    fn zero_id_is_an_internal_failure() {
        let mut p = Scripted {
            creation: Some(Ok(Creation::Created(0))),
            ..Default::default()
        };
        let outcome = p.provision("alice", Some("pw"));
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Internal));
        assert_eq!(p.steps, ["begin", "create", "finish"]);
    }

    #[test]
    fn password_failure_keeps_the_id() {
        let mut p = Scripted {
            password: Some(StepError::new(
                FailureKind::RemoteError {
                    code: ResultCode::SERVER_ERROR,
                },
                "boom",
            )),
            ..Default::default()
        };
        let outcome = p.provision("alice", Some("pw"));
        let user_id = UserId::new(5).unwrap();
        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::PasswordSetFailed { user_id })
        );
        assert_eq!(outcome.user_id(), Some(user_id));
    }
}
