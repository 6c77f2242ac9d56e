//! On-disk metadata document for a stash directory.
//!
//! The document is JSON with a BLAKE3 checksum computed over the same
//! document serialized with an empty `checksum` field. Writes go through a
//! temporary file and an atomic rename so readers never see a torn document.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{FIRST_USER_ID, META_FORMAT_VERSION};
use crate::error::{Result, StashError};
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredUser {
    pub user_id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payload segment under `data/`. Only its presence and length are tracked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SegmentRef {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StashMeta {
    pub format_version: u32,
    pub store_id: Uuid,
    pub next_user_id: u64,
    #[serde(default)]
    pub users: Vec<StoredUser>,
    #[serde(default)]
    pub data_segments: Vec<SegmentRef>,
    #[serde(default)]
    pub checksum: String,
}

impl StashMeta {
    pub fn new() -> Self {
        Self {
            format_version: META_FORMAT_VERSION,
            store_id: Uuid::new_v4(),
            next_user_id: FIRST_USER_ID,
            users: Vec::new(),
            data_segments: Vec::new(),
            checksum: String::new(),
        }
    }

    fn compute_checksum(&self) -> Result<String> {
        let unsealed = Self {
            checksum: String::new(),
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unsealed)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    /// Read and verify the document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = match fs_err::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StashError::MissingMetadata {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        Self::decode(path, &raw)
    }

    fn decode(path: &Path, raw: &[u8]) -> Result<Self> {
        let meta: Self =
            serde_json::from_slice(raw).map_err(|err| StashError::CorruptMetadata {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        if meta.format_version != META_FORMAT_VERSION {
            return Err(StashError::UnsupportedVersion {
                found: meta.format_version,
            });
        }
        if meta.checksum != meta.compute_checksum()? {
            return Err(StashError::ChecksumMismatch {
                path: path.to_path_buf(),
            });
        }
        meta.check_consistency(path)?;
        Ok(meta)
    }

    fn check_consistency(&self, path: &Path) -> Result<()> {
        let corrupt = |reason: String| StashError::CorruptMetadata {
            path: path.to_path_buf(),
            reason,
        };
        if self.next_user_id < FIRST_USER_ID {
            return Err(corrupt(format!("next_user_id {}", self.next_user_id)));
        }
        let mut seen = std::collections::HashSet::new();
        for user in &self.users {
            if user.user_id.get() >= self.next_user_id {
                return Err(corrupt(format!(
                    "user id {} not below next_user_id {}",
                    user.user_id, self.next_user_id
                )));
            }
            if !seen.insert(user.username.as_str()) {
                return Err(corrupt(format!("duplicate username '{}'", user.username)));
            }
        }
        Ok(())
    }

    /// Seal the document and atomically replace `path` with it.
    pub fn store(&mut self, path: &Path) -> Result<()> {
        self.checksum = self.compute_checksum()?;
        let bytes = serde_json::to_vec_pretty(self)?;
        let mut file = AtomicWriteFile::open(path)?;
        file.write_all(&bytes)?;
        file.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stored_document_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stash.meta");
        let mut meta = StashMeta::new();
        meta.users.push(StoredUser {
            user_id: UserId::new(1).unwrap(),
            username: "alice".into(),
            password_hash: None,
            created_at: Utc::now(),
        });
        meta.next_user_id = 2;
        meta.store(&path).unwrap();

        let loaded = StashMeta::load(&path).unwrap();
        assert_eq!(loaded.store_id, meta.store_id);
        assert_eq!(loaded.users.len(), 1);
        assert_eq!(loaded.users[0].username, "alice");
    }

    #[test]
    fn tampered_document_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stash.meta");
        StashMeta::new().store(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"next_user_id\": 1", "\"next_user_id\": 9")).unwrap();
        assert!(matches!(
            StashMeta::load(&path),
            Err(StashError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn garbage_is_corrupt_and_absence_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stash.meta");
        assert!(matches!(
            StashMeta::load(&path),
            Err(StashError::MissingMetadata { .. })
        ));
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            StashMeta::load(&path),
            Err(StashError::CorruptMetadata { .. })
        ));
    }
}
