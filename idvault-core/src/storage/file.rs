//! File-backed key-value store.
//!
//! Each key maps to one file under the root directory. Writes go to a
//! uniquely named temporary file in the same directory, are synced, then
//! renamed over the target so a crash leaves either the old or the new value.
//! Temporary names start with `.`, which no valid key does.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::KeyValueStore;
use crate::error::{VaultError, VaultResult};

/// Directory-backed [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> VaultResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| map_io_err(&err))?;
        Ok(Self { root })
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> VaultResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn validate_key(key: &str) -> VaultResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(VaultError::invalid_input(
            "storage_key",
            format!("`{key}` is not a valid file store key"),
        ))
    }
}

fn map_io_err(err: &io::Error) -> VaultError {
    VaultError::Storage(err.to_string())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(map_io_err(&err)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> VaultResult<()> {
        let path = self.path_for(key)?;
        // Dropping the temp file on any early return removes it.
        let mut file = NamedTempFile::new_in(&self.root).map_err(|err| map_io_err(&err))?;
        file.write_all(value)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|err| map_io_err(&err))?;
        file.persist(&path).map_err(|err| map_io_err(&err.error))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(map_io_err(&err)),
        }
    }

    fn exists(&self, key: &str) -> VaultResult<bool> {
        let path = self.path_for(key)?;
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(map_io_err(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        assert_eq!(store.get("zk_identity_profile").unwrap(), None);

        store.set("zk_identity_profile", b"first").unwrap();
        store.set("zk_identity_profile", b"second").unwrap();
        assert_eq!(
            store.get("zk_identity_profile").unwrap(),
            Some(b"second".to_vec())
        );
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1, "temporary files must not be left behind");
    }

    #[test]
    fn test_temp_files_never_collide_with_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        store.set("profile.tmp", b"sibling").unwrap();
        store.set("profile", b"value").unwrap();
        store.set("profile", b"updated").unwrap();

        assert_eq!(store.get("profile.tmp").unwrap(), Some(b"sibling".to_vec()));
        assert_eq!(store.get("profile").unwrap(), Some(b"updated".to_vec()));
    }

    #[test]
    fn test_exists_reports_unreadable_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("vault");
        let store = FileStore::open(&root).expect("open");
        fs::remove_dir(&root).unwrap();
        fs::write(&root, b"not a directory").unwrap();

        assert!(matches!(store.exists("profile"), Err(VaultError::Storage(_))));
        assert!(matches!(store.get("profile"), Err(VaultError::Storage(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        store.delete("missing").unwrap();
        store.set("present", b"x").unwrap();
        store.delete("present").unwrap();
        assert!(!store.exists("present").unwrap());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(matches!(
                store.set(key, b"x"),
                Err(VaultError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        FileStore::open(dir.path())
            .unwrap()
            .set("k", b"persisted")
            .unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(b"persisted".to_vec()));
    }
}
