//! Session key cache.
//!
//! Holds the last derived vault key for the lifetime of one interactive
//! session so the wallet is not prompted on every vault access. The cache
//! is an owned value injected into the vault and controller; it is never
//! written to persistent storage.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::crypto::SymmetricKey;

/// In-memory slot for the current session's vault key.
#[derive(Debug, Default)]
pub struct SessionKeyCache {
    slot: Mutex<Option<SymmetricKey>>,
}

impl SessionKeyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned slot still holds a valid Option; keep using it.
    fn slot(&self) -> MutexGuard<'_, Option<SymmetricKey>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached key. The previous key is zeroized.
    pub fn set(&self, key: Option<SymmetricKey>) {
        *self.slot() = key;
    }

    /// Returns a copy of the cached key, if any.
    #[must_use]
    pub fn get(&self) -> Option<SymmetricKey> {
        self.slot().clone()
    }

    /// Clears (and zeroizes) the cached key.
    pub fn clear(&self) {
        self.slot().take();
    }

    /// Whether a key is cached.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::derive_key;

    #[test]
    fn test_set_get_clear() {
        let cache = SessionKeyCache::new();
        assert!(cache.get().is_none());

        let key = derive_key(b"0xSIG_A").unwrap();
        cache.set(Some(key.clone()));
        assert!(cache.is_set());
        assert_eq!(cache.get(), Some(key));

        cache.clear();
        assert!(!cache.is_set());
        cache.set(None);
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_caches_are_independent() {
        let a = SessionKeyCache::new();
        let b = SessionKeyCache::new();
        a.set(Some(derive_key(b"0xSIG_A").unwrap()));
        assert!(!b.is_set());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(SessionKeyCache::new());
        let writer = Arc::clone(&cache);
        std::thread::spawn(move || writer.set(Some(derive_key(b"0xSIG_A").unwrap())))
            .join()
            .unwrap();
        assert_eq!(cache.get(), Some(derive_key(b"0xSIG_A").unwrap()));
    }
}
