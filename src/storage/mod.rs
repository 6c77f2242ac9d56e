//! Direct access to a stash directory.
//!
//! Responsibilities:
//! - Bind a handle to a directory by taking its master lock.
//! - Load the namespace index from the metadata document without touching payload data.
//! - Answer availability queries and create users while the lock is held.
//!
//! A [`Storage`] is constructed unbound. It becomes bound to one directory in
//! [`Storage::lock_master`] and can be rebound after [`Storage::unlock_master`].

mod meta;
mod password;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use same_file::Handle;

use crate::constants::{DATA_DIR_NAME, META_FILE_NAME};
use crate::error::{Result, StashError};
use crate::lock::MasterLock;
use crate::types::user::username_problem;
use crate::types::{LockSettings, UserId, UserRecord};

use meta::{StashMeta, StoredUser};

/// Controls how much of a store [`Storage::process`] loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Keep a handle on the metadata so later writes can detect a replaced file.
    pub keep_open: bool,
    /// Skip payload segments entirely; only the namespace index is loaded.
    pub ignore_data: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            keep_open: true,
            ignore_data: true,
        }
    }
}

/// Handle on one stash directory's user namespace.
#[derive(Debug, Default)]
pub struct Storage {
    directory: Option<PathBuf>,
    lock: Option<MasterLock>,
    meta: Option<StashMeta>,
    meta_handle: Option<Handle>,
    index: HashMap<String, usize>,
}

impl Storage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stash at `directory`, creating the directory if needed.
    pub fn initialize<P: AsRef<Path>>(directory: P, settings: &LockSettings) -> Result<()> {
        let directory = directory.as_ref();
        fs_err::create_dir_all(directory)?;
        let lock = MasterLock::acquire(directory, settings)?;

        let meta_path = directory.join(META_FILE_NAME);
        if meta_path.exists() {
            return Err(StashError::AlreadyInitialized {
                path: directory.to_path_buf(),
            });
        }
        fs_err::create_dir_all(directory.join(DATA_DIR_NAME))?;
        let mut meta = StashMeta::new();
        meta.store(&meta_path)?;
        tracing::info!(
            path = %directory.display(),
            store_id = %meta.store_id,
            "initialized empty stash"
        );
        lock.release()
    }

    /// Bind to `directory` and take its master lock.
    pub fn lock_master<P: AsRef<Path>>(&mut self, directory: P, settings: &LockSettings) -> Result<()> {
        let directory = directory.as_ref();
        if let Some(bound) = &self.directory {
            return Err(StashError::Lock(format!(
                "handle already holds the master lock for {}",
                bound.display()
            )));
        }
        let lock = MasterLock::acquire(directory, settings)?;
        self.directory = Some(directory.to_path_buf());
        self.lock = Some(lock);
        Ok(())
    }

    /// Release the master lock and forget everything loaded under it.
    pub fn unlock_master(&mut self) -> Result<()> {
        self.meta = None;
        self.meta_handle = None;
        self.index.clear();
        self.directory = None;
        match self.lock.take() {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Load the namespace index of the locked directory.
    pub fn process<P: AsRef<Path>>(&mut self, directory: P, options: ProcessOptions) -> Result<()> {
        let directory = directory.as_ref();
        let bound = self.locked_directory()?;
        if bound != directory {
            return Err(StashError::Lock(format!(
                "master lock is held for {}, not {}",
                bound.display(),
                directory.display()
            )));
        }

        let meta_path = directory.join(META_FILE_NAME);
        let meta = StashMeta::load(&meta_path)?;
        if !options.ignore_data {
            verify_segments(directory, &meta)?;
        }

        self.index = meta
            .users
            .iter()
            .enumerate()
            .map(|(slot, user)| (user.username.clone(), slot))
            .collect();
        self.meta_handle = if options.keep_open {
            Some(Handle::from_path(&meta_path)?)
        } else {
            None
        };
        tracing::debug!(
            path = %directory.display(),
            users = meta.users.len(),
            segments = meta.data_segments.len(),
            "namespace index loaded"
        );
        self.meta = Some(meta);
        Ok(())
    }

    /// Whether `username` is free in the loaded namespace.
    pub fn username_available(&self, username: &str) -> Result<bool> {
        self.loaded()?;
        Ok(!self.index.contains_key(username))
    }

    /// Create `username`, assigning it the next user id.
    ///
    /// `acting_user` is the namespace owner performing the change; `None`
    /// acts as the store itself.
    pub fn create_username(
        &mut self,
        acting_user: Option<UserId>,
        username: &str,
    ) -> Result<UserRecord> {
        validate_username(username)?;
        self.check_acting_user(acting_user)?;
        if self.index.contains_key(username) {
            return Err(StashError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let meta = self.loaded_mut()?;
        let raw_id = meta.next_user_id;
        let user_id = UserId::new(raw_id)
            .ok_or(StashError::InternalInvariant("store allocated user id 0"))?;
        let next = raw_id
            .checked_add(1)
            .ok_or(StashError::InternalInvariant("user id space exhausted"))?;

        meta.users.push(StoredUser {
            user_id,
            username: username.to_string(),
            password_hash: None,
            created_at: Utc::now(),
        });
        meta.next_user_id = next;

        if let Err(err) = self.persist() {
            let meta = self.loaded_mut()?;
            meta.users.pop();
            meta.next_user_id = raw_id;
            return Err(err);
        }
        let slot = self.loaded()?.users.len() - 1;
        self.index.insert(username.to_string(), slot);
        tracing::debug!(username, user_id = user_id.get(), "username created");
        Ok(UserRecord {
            user_id,
            username: username.to_string(),
            password_set: false,
        })
    }

    /// Set the password of `user_id`.
    pub fn set_password(
        &mut self,
        acting_user: Option<UserId>,
        user_id: UserId,
        password: &str,
    ) -> Result<()> {
        self.check_acting_user(acting_user)?;
        let slot = self.slot_of(user_id)?;
        let hash = password::hash_password(password)?;

        let meta = self.loaded_mut()?;
        let previous = meta.users[slot].password_hash.replace(hash);
        if let Err(err) = self.persist() {
            self.loaded_mut()?.users[slot].password_hash = previous;
            return Err(err);
        }
        tracing::debug!(user_id = user_id.get(), "password set");
        Ok(())
    }

    /// Check `password` against the stored hash of `username`.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let meta = self.loaded()?;
        let Some(&slot) = self.index.get(username) else {
            return Ok(false);
        };
        match &meta.users[slot].password_hash {
            Some(hash) => password::verify_password(hash, password),
            None => Ok(false),
        }
    }

    #[must_use]
    pub fn user(&self, username: &str) -> Option<UserRecord> {
        let meta = self.meta.as_ref()?;
        self.index
            .get(username)
            .map(|&slot| record_of(&meta.users[slot]))
    }

    /// Users in creation order.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        self.meta
            .as_ref()
            .map(|meta| meta.users.iter().map(record_of).collect())
            .unwrap_or_default()
    }

    /// Release the lock and drop the handle.
    pub fn close(mut self) -> Result<()> {
        self.unlock_master()
    }

    fn locked_directory(&self) -> Result<&Path> {
        match (&self.directory, &self.lock) {
            (Some(directory), Some(_)) => Ok(directory),
            _ => Err(StashError::UnboundStore),
        }
    }

    fn loaded(&self) -> Result<&StashMeta> {
        self.locked_directory()?;
        self.meta.as_ref().ok_or(StashError::UnboundStore)
    }

    fn loaded_mut(&mut self) -> Result<&mut StashMeta> {
        self.locked_directory()?;
        self.meta.as_mut().ok_or(StashError::UnboundStore)
    }

    fn slot_of(&self, user_id: UserId) -> Result<usize> {
        self.loaded()?
            .users
            .iter()
            .position(|user| user.user_id == user_id)
            .ok_or(StashError::UnknownUser { user_id })
    }

    fn check_acting_user(&self, acting_user: Option<UserId>) -> Result<()> {
        match acting_user {
            Some(user_id) => self.slot_of(user_id).map(|_| ()),
            None => self.loaded().map(|_| ()),
        }
    }

    fn persist(&mut self) -> Result<()> {
        let directory = self.locked_directory()?.to_path_buf();
        let meta_path = directory.join(META_FILE_NAME);
        if let Some(kept) = &self.meta_handle {
            if Handle::from_path(&meta_path)? != *kept {
                return Err(StashError::CorruptMetadata {
                    path: meta_path,
                    reason: "metadata was replaced while the master lock was held".into(),
                });
            }
        }
        self.loaded_mut()?.store(&meta_path)?;
        if self.meta_handle.is_some() {
            self.refresh_handle(&meta_path);
        }
        Ok(())
    }

    /// Track the file just committed. The write has landed, so a failure here
    /// only loses replacement detection for later writes.
    fn refresh_handle(&mut self, meta_path: &Path) {
        self.meta_handle = match Handle::from_path(meta_path) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(
                    path = %meta_path.display(),
                    error = %err,
                    "metadata committed but could not be reopened"
                );
                None
            }
        };
    }
}

fn record_of(user: &StoredUser) -> UserRecord {
    UserRecord {
        user_id: user.user_id,
        username: user.username.clone(),
        password_set: user.password_hash.is_some(),
    }
}

fn verify_segments(directory: &Path, meta: &StashMeta) -> Result<()> {
    let data_dir = directory.join(DATA_DIR_NAME);
    for segment in &meta.data_segments {
        let len = fs_err::metadata(data_dir.join(&segment.name))
            .map(|m| m.len())
            .map_err(|_| StashError::MissingSegment {
                name: segment.name.clone(),
            })?;
        if len < segment.length {
            return Err(StashError::MissingSegment {
                name: segment.name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    match username_problem(username) {
        Some(reason) => Err(StashError::InvalidUsername { reason }),
        None => Ok(()),
    }
}
