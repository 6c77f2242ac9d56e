use crate::remote::{ResultCode, SessionFactory, StashClient};
use crate::types::{FailureKind, RemoteSettings, RemoteTarget, UserId};

use super::{Creation, Provisioner, StepError};

/// Provisions through the admin interface of a running instance.
///
/// The session is opened eagerly in `begin` so that an unreachable server or
/// bad admin credentials surface before any mutating request is sent.
pub struct RemoteProvisioner<'a> {
    target: &'a RemoteTarget,
    settings: RemoteSettings,
    sessions: &'a dyn SessionFactory,
    verbose: bool,
    client: Option<Box<dyn StashClient>>,
}

impl<'a> RemoteProvisioner<'a> {
    #[must_use]
    pub fn new(
        target: &'a RemoteTarget,
        settings: RemoteSettings,
        sessions: &'a dyn SessionFactory,
    ) -> Self {
        Self {
            target,
            settings,
            sessions,
            verbose: false,
            client: None,
        }
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn client(&mut self) -> Result<&mut Box<dyn StashClient>, StepError> {
        self.client.as_mut().ok_or_else(|| {
            StepError::new(
                FailureKind::ConnectionFailed {
                    code: ResultCode::NOT_CONNECTED,
                },
                ResultCode::NOT_CONNECTED.to_string(),
            )
        })
    }
}

fn connection_failed(code: ResultCode) -> StepError {
    StepError::new(FailureKind::ConnectionFailed { code }, code.to_string())
}

impl Provisioner for RemoteProvisioner<'_> {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn begin(&mut self) -> Result<(), StepError> {
        let client = self
            .client
            .insert(self.sessions.open_session(&self.settings));
        client.set_authority(
            &self.target.admin_username,
            self.target.admin_password.as_str(),
        );
        client
            .add_server(&self.target.host, self.settings.server_priority)
            .map_err(connection_failed)?;
        client.connect().map_err(connection_failed)?;
        tracing::debug!(host = %self.target.host, "admin session established");
        Ok(())
    }

    fn create(&mut self, username: &str) -> Result<Creation, StepError> {
        match self.client()?.create_username(username) {
            Ok(raw_id) => Ok(Creation::Created(raw_id)),
            Err(ResultCode::USER_EXISTS) => Ok(Creation::AlreadyExists),
            Err(code) => Err(StepError::new(
                FailureKind::RemoteError { code },
                code.to_string(),
            )),
        }
    }

    fn set_password(&mut self, user_id: UserId, password: &str) -> Result<(), StepError> {
        self.client()?
            .set_password(user_id, password)
            .map_err(|code| StepError::new(FailureKind::RemoteError { code }, code.to_string()))
    }

    fn finish(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close();
        }
    }
}
