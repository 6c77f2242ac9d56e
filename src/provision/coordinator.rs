use std::fmt;

#[cfg(feature = "remote")]
use crate::remote::HttpSessionFactory;
use crate::remote::{ResultCode, SessionFactory};
use crate::types::{FailureKind, Outcome, ProvisionOptions, ProvisionRequest, Target};

use super::{LocalProvisioner, Provisioner, RemoteProvisioner};

/// Validates a request and hands it to the matching provisioner.
///
/// Holds no state between calls besides its configuration.
pub struct Coordinator {
    options: ProvisionOptions,
    sessions: Option<Box<dyn SessionFactory>>,
}

impl Coordinator {
    /// Coordinator using the HTTP admin client for remote requests.
    #[cfg(feature = "remote")]
    #[must_use]
    pub fn new(options: ProvisionOptions) -> Self {
        Self::with_session_factory(options, HttpSessionFactory)
    }

    /// Coordinator without remote support; remote requests fail to connect.
    #[cfg(not(feature = "remote"))]
    #[must_use]
    pub fn new(options: ProvisionOptions) -> Self {
        Self {
            options,
            sessions: None,
        }
    }

    #[must_use]
    pub fn with_session_factory<F>(options: ProvisionOptions, sessions: F) -> Self
    where
        F: SessionFactory + 'static,
    {
        Self {
            options,
            sessions: Some(Box::new(sessions)),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Provision the user described by `request`.
    pub fn provision(&self, request: &ProvisionRequest) -> Outcome {
        let target = match request.validate() {
            Ok(target) => target,
            Err(message) => {
                tracing::debug!(%message, "rejected provisioning request");
                return Outcome::failed(FailureKind::InvalidRequest, message);
            }
        };
        let username = request.username.as_str();
        let password = request.password_str();

        match target {
            Target::Local(directory) => {
                LocalProvisioner::new(directory, self.options.lock)
                    .with_verbose(self.options.verbose)
                    .provision(username, password)
            }
            Target::Remote(remote) => {
                let Some(sessions) = self.sessions.as_deref() else {
                    return Outcome::failed(
                        FailureKind::ConnectionFailed {
                            code: ResultCode::NO_SERVERS,
                        },
                        "built without remote support",
                    );
                };
                RemoteProvisioner::new(remote, self.options.remote, sessions)
                    .with_verbose(self.options.verbose)
                    .provision(username, password)
            }
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("options", &self.options)
            .field("remote", &self.sessions.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::StashClient;
    use crate::types::{RemoteSettings, RemoteTarget, UserId};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Unreachable;

    impl StashClient for Unreachable {
        fn set_authority(&mut self, _: &str, _: &str) {}
        fn add_server(&mut self, _: &str, _: u32) -> Result<(), ResultCode> {
            Ok(())
        }
        fn connect(&mut self) -> Result<(), ResultCode> {
            Err(ResultCode::TIMEOUT)
        }
        fn create_username(&mut self, _: &str) -> Result<u64, ResultCode> {
            Err(ResultCode::NOT_CONNECTED)
        }
        fn set_password(&mut self, _: UserId, _: &str) -> Result<(), ResultCode> {
            Err(ResultCode::NOT_CONNECTED)
        }
        fn close(&mut self) {}
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl SessionFactory for Counting {
        fn open_session(&self, _: &RemoteSettings) -> Box<dyn StashClient> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::new(Unreachable)
        }
    }

    #[test]
    fn both_backends_is_rejected_without_io() {
        let sessions = Counting::default();
        let coordinator =
            Coordinator::with_session_factory(ProvisionOptions::default(), sessions.clone());
        let scratch = TempDir::new().unwrap();
        let directory = scratch.path().join("stash");

        let mut request = ProvisionRequest::local(&directory, "alice");
        request.remote = Some(RemoteTarget::new("127.0.0.1:1", "admin", "pw"));
        let outcome = coordinator.provision(&request);

        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidRequest));
        assert_eq!(sessions.0.load(Ordering::SeqCst), 0);
        assert!(!directory.exists());
    }

    #[test]
    fn connect_timeout_is_a_connection_failure() {
        let sessions = Counting::default();
        let coordinator =
            Coordinator::with_session_factory(ProvisionOptions::default(), sessions.clone());
        let request =
            ProvisionRequest::remote(RemoteTarget::new("127.0.0.1:1", "admin", "pw"), "alice");
        let outcome = coordinator.provision(&request);
        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::ConnectionFailed {
                code: ResultCode::TIMEOUT
            })
        );
        assert_eq!(sessions.0.load(Ordering::SeqCst), 1);
    }
}
