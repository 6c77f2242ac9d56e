use std::path::Path;

use crate::error::StashError;
use crate::storage::{ProcessOptions, Storage};
use crate::types::{FailureKind, LockSettings, UserId};

use super::{Creation, Provisioner, StepError};

/// Provisions directly into a stash directory under its master lock.
///
/// The lock is taken in `begin` and held through the availability check,
/// the create and the password step, so concurrent runs against the same
/// directory cannot both see a name as free.
pub struct LocalProvisioner<'a> {
    directory: &'a Path,
    lock: LockSettings,
    verbose: bool,
    storage: Storage,
}

impl<'a> LocalProvisioner<'a> {
    #[must_use]
    pub fn new(directory: &'a Path, lock: LockSettings) -> Self {
        Self {
            directory,
            lock,
            verbose: false,
            storage: Storage::new(),
        }
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn step_error(err: &StashError, context: FailureKind) -> StepError {
    StepError::new(err.failure_kind(context), err.to_string())
}

impl Provisioner for LocalProvisioner<'_> {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn begin(&mut self) -> Result<(), StepError> {
        self.storage
            .lock_master(self.directory, &self.lock)
            .map_err(|err| step_error(&err, FailureKind::LockUnavailable))?;
        self.storage
            .process(
                self.directory,
                ProcessOptions {
                    keep_open: true,
                    ignore_data: true,
                },
            )
            .map_err(|err| step_error(&err, FailureKind::StoreUnreadable))
    }

    fn create(&mut self, username: &str) -> Result<Creation, StepError> {
        let available = self
            .storage
            .username_available(username)
            .map_err(|err| step_error(&err, FailureKind::StoreUnreadable))?;
        if !available {
            return Ok(Creation::AlreadyExists);
        }
        match self.storage.create_username(None, username) {
            Ok(record) => Ok(Creation::Created(record.user_id.get())),
            Err(StashError::UsernameTaken { .. }) => Ok(Creation::AlreadyExists),
            Err(err) => Err(step_error(&err, FailureKind::StoreWriteFailed)),
        }
    }

    fn set_password(&mut self, user_id: UserId, password: &str) -> Result<(), StepError> {
        self.storage
            .set_password(None, user_id, password)
            .map_err(|err| step_error(&err, FailureKind::StoreWriteFailed))
    }

    fn finish(&mut self) {
        if let Err(err) = self.storage.unlock_master() {
            tracing::warn!(
                path = %self.directory.display(),
                error = %err,
                "releasing master lock failed"
            );
        }
    }
}
