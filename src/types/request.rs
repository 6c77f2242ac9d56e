//! Provisioning requests and their validation.

use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::user::username_problem;

/// Which backend a request is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Direct access to a stash directory on this host.
    Local,
    /// A running instance reached through its admin API.
    Remote,
}

/// Where a running instance lives and who to act as.
#[derive(Clone)]
pub struct RemoteTarget {
    /// `host:port`, or a full base URL.
    pub host: String,
    pub admin_username: String,
    pub admin_password: Zeroizing<String>,
}

impl RemoteTarget {
    pub fn new<H, U, P>(host: H, admin_username: U, admin_password: P) -> Self
    where
        H: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            host: host.into(),
            admin_username: admin_username.into(),
            admin_password: Zeroizing::new(admin_password.into()),
        }
    }
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("host", &self.host)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

/// A request to create one user.
///
/// `directory` and `remote` are both optional so that a malformed request
/// (both or neither filled in) can be represented and rejected by the
/// coordinator before any I/O happens.
#[derive(Clone)]
pub struct ProvisionRequest {
    pub username: String,
    pub password: Option<Zeroizing<String>>,
    pub backend: Backend,
    pub directory: Option<PathBuf>,
    pub remote: Option<RemoteTarget>,
}

impl ProvisionRequest {
    /// Request against a stash directory.
    pub fn local<P: Into<PathBuf>, S: Into<String>>(directory: P, username: S) -> Self {
        Self {
            username: username.into(),
            password: None,
            backend: Backend::Local,
            directory: Some(directory.into()),
            remote: None,
        }
    }

    /// Request against a running instance.
    pub fn remote<S: Into<String>>(target: RemoteTarget, username: S) -> Self {
        Self {
            username: username.into(),
            password: None,
            backend: Backend::Remote,
            directory: None,
            remote: Some(target),
        }
    }

    #[must_use]
    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub(crate) fn password_str(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }

    /// Check the request shape and resolve the backend parameters.
    pub(crate) fn validate(&self) -> Result<Target<'_>, String> {
        if self.username.trim().is_empty() {
            return Err("missing required parameter: username".to_string());
        }
        if let Some(reason) = username_problem(&self.username) {
            return Err(format!("invalid username: {reason}"));
        }
        let target = match (&self.directory, &self.remote) {
            (Some(_), Some(_)) => {
                return Err("cannot specify both a directory and a host".to_string());
            }
            (None, None) => {
                return Err("missing required option, either a directory or a host".to_string());
            }
            (Some(directory), None) => Target::Local(directory),
            (None, Some(remote)) => Target::Remote(remote),
        };

        match (self.backend, &target) {
            (Backend::Local, Target::Local(directory)) => {
                if directory.as_os_str().is_empty() {
                    return Err("directory path is empty".to_string());
                }
            }
            (Backend::Remote, Target::Remote(remote)) => {
                if remote.host.trim().is_empty() {
                    return Err("host is empty".to_string());
                }
                if remote.admin_username.is_empty() {
                    return Err("missing admin username for remote provisioning".to_string());
                }
            }
            (Backend::Local, Target::Remote(_)) => {
                return Err("local backend selected but only a host was given".to_string());
            }
            (Backend::Remote, Target::Local(_)) => {
                return Err("remote backend selected but only a directory was given".to_string());
            }
        }
        Ok(target)
    }
}

impl fmt::Debug for ProvisionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionRequest")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("backend", &self.backend)
            .field("directory", &self.directory)
            .field("remote", &self.remote)
            .finish()
    }
}

/// Backend parameters of a request that passed validation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    Local(&'a Path),
    Remote(&'a RemoteTarget),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RemoteTarget {
        RemoteTarget::new("127.0.0.1:13600", "admin", "secret")
    }

    #[test]
    fn local_request_validates() {
        let request = ProvisionRequest::local("/var/lib/stash", "alice");
        assert!(matches!(request.validate(), Ok(Target::Local(_))));
    }

    #[test]
    fn both_targets_are_rejected() {
        let mut request = ProvisionRequest::local("/var/lib/stash", "alice");
        request.remote = Some(target());
        let err = request.validate().unwrap_err();
        assert!(err.contains("both"));
    }

    #[test]
    fn neither_target_is_rejected() {
        let mut request = ProvisionRequest::remote(target(), "alice");
        request.remote = None;
        assert!(request.validate().unwrap_err().contains("either"));
    }

    #[test]
    fn backend_must_match_target() {
        let mut request = ProvisionRequest::remote(target(), "alice");
        request.backend = Backend::Local;
        assert!(request.validate().is_err());
    }

    #[test]
    fn blank_username_is_rejected() {
        let request = ProvisionRequest::local("/var/lib/stash", "   ");
        assert!(request.validate().is_err());
    }

    #[test]
    fn malformed_username_is_rejected_up_front() {
        let long = "x".repeat(65);
        for name in ["bad name", "ctl\u{7}", long.as_str()] {
            let err = ProvisionRequest::local("/var/lib/stash", name)
                .validate()
                .unwrap_err();
            assert!(err.starts_with("invalid username"), "{err}");
        }
        assert!(ProvisionRequest::remote(target(), "bad name").validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let request = ProvisionRequest::remote(target(), "alice").with_password("hunter2");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("alice"));
    }
}
