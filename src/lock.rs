//! Directory-scoped master lock backed by OS advisory file locks.
//!
//! The lock lives in a dedicated file next to the metadata so the metadata
//! itself can be replaced atomically without dropping the lock.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use fs2::FileExt;

use crate::constants::MASTER_LOCK_FILE_NAME;
use crate::error::{Result, StashError};
use crate::types::LockSettings;

/// Exclusive lock over one stash directory. Released on drop.
#[derive(Debug)]
pub struct MasterLock {
    file: File,
    path: PathBuf,
}

impl MasterLock {
    /// Take the lock without waiting. `Ok(None)` means another holder has it.
    pub fn try_acquire(directory: &Path) -> Result<Option<Self>> {
        let path = lock_path(directory)?;
        let file = fs_err::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| StashError::Lock(err.to_string()))?
            .into_parts()
            .0;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if is_contended(&err) => Ok(None),
            Err(err) => Err(StashError::Lock(format!(
                "locking {} failed: {err}",
                path.display()
            ))),
        }
    }

    /// Take the lock, polling until `settings.timeout_ms` has elapsed.
    pub fn acquire(directory: &Path, settings: &LockSettings) -> Result<Self> {
        let started = Instant::now();
        let timeout = settings.timeout();
        loop {
            if let Some(lock) = Self::try_acquire(directory)? {
                tracing::debug!(
                    path = %lock.path.display(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "master lock acquired"
                );
                return Ok(lock);
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(StashError::LockTimeout {
                    path: directory.to_path_buf(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            thread::sleep(settings.poll_interval().min(timeout - elapsed));
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly, surfacing unlock errors that `Drop` would swallow.
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.file)?;
        tracing::debug!(path = %self.path.display(), "master lock released");
        Ok(())
    }
}

impl Drop for MasterLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path(directory: &Path) -> Result<PathBuf> {
    if !directory.is_dir() {
        return Err(StashError::Lock(format!(
            "{} is not a stash directory",
            directory.display()
        )));
    }
    Ok(directory.join(MASTER_LOCK_FILE_NAME))
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick() -> LockSettings {
        LockSettings {
            timeout_ms: 60,
            poll_interval_ms: 10,
        }
    }

    #[test]
    fn second_holder_is_refused() {
        let dir = TempDir::new().unwrap();
        let held = MasterLock::try_acquire(dir.path()).unwrap().unwrap();
        assert!(MasterLock::try_acquire(dir.path()).unwrap().is_none());
        drop(held);
        assert!(MasterLock::try_acquire(dir.path()).unwrap().is_some());
    }

    #[test]
    fn acquire_times_out_while_held() {
        let dir = TempDir::new().unwrap();
        let _held = MasterLock::acquire(dir.path(), &quick()).unwrap();
        let err = MasterLock::acquire(dir.path(), &quick()).unwrap_err();
        assert!(matches!(err, StashError::LockTimeout { .. }));
    }

    #[test]
    fn explicit_release_frees_the_directory() {
        let dir = TempDir::new().unwrap();
        let lock = MasterLock::acquire(dir.path(), &quick()).unwrap();
        lock.release().unwrap();
        assert!(MasterLock::acquire(dir.path(), &quick()).is_ok());
    }

    #[test]
    fn missing_directory_is_a_lock_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = MasterLock::acquire(&missing, &quick()).unwrap_err();
        assert!(matches!(err, StashError::Lock(_)));
        assert!(!missing.exists());
    }
}
