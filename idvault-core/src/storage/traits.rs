//! Platform interface for the persistent key-value store.

use crate::error::VaultResult;

/// Durable key-value storage for small values.
///
/// The vault writes exactly one key. In the browser this is local storage,
/// natively a directory of small files.
///
/// # Implementation Notes
///
/// `set` MUST be atomic: after it returns, `get` yields either the complete
/// old value or the complete new value, never a partial write. File-backed
/// implementations use the write-to-temp-then-rename pattern.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if the key does not exist
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`](crate::VaultError::Storage) if the
    /// store is unavailable.
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>>;

    /// Atomically writes `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`](crate::VaultError::Storage) if the
    /// write fails.
    fn set(&self, key: &str, value: &[u8]) -> VaultResult<()>;

    /// Deletes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    /// Only returns an error for actual storage failures.
    fn delete(&self, key: &str) -> VaultResult<()>;

    /// Checks if a value exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails.
    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> VaultResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> VaultResult<bool> {
        (**self).exists(key)
    }
}
