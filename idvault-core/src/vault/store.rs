//! Sealing and opening the identity record under one storage key.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::blob::VaultBlob;
use crate::crypto::{cipher, SymmetricKey};
use crate::error::{VaultError, VaultResult};
use crate::identity::IdentityRecord;
use crate::session::SessionKeyCache;
use crate::storage::KeyValueStore;

/// Storage key the vault blob lives under.
pub const DEFAULT_STORAGE_KEY: &str = "zk_identity_profile";

#[derive(Serialize)]
struct StoredIdentityRef<'a> {
    #[serde(flatten)]
    record: &'a IdentityRecord,
    #[serde(rename = "updatedAt")]
    updated_at: u64,
}

#[derive(Deserialize)]
struct StoredIdentity {
    #[serde(flatten)]
    record: IdentityRecord,
    /// The web client stores an ISO-8601 string here; native writers store
    /// unix seconds.
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<serde_json::Value>,
}

/// A decrypted identity together with its envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedIdentity {
    /// The decrypted record.
    pub record: IdentityRecord,
    /// Unix seconds of the last save, when written by a native client.
    pub updated_at: Option<u64>,
}

/// Encrypted single-record store.
///
/// Every `save` draws a fresh IV, so saving the same record twice under the
/// same key produces different blobs.
pub struct Vault<S> {
    store: S,
    storage_key: String,
    session: Arc<SessionKeyCache>,
}

impl<S: KeyValueStore> Vault<S> {
    /// Creates a vault over `store` using the default storage key.
    #[must_use]
    pub fn new(store: S, session: Arc<SessionKeyCache>) -> Self {
        Self {
            store,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            session,
        }
    }

    /// Uses a custom storage key instead of [`DEFAULT_STORAGE_KEY`].
    #[must_use]
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    /// The storage key the blob is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The session cache this vault populates on save.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionKeyCache> {
        &self.session
    }

    /// Encrypts and persists `record`, overwriting any previous blob, and
    /// caches `key` as the session key.
    ///
    /// Nothing is written unless encryption succeeded, and the store write
    /// itself is atomic.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails. The
    /// session key is left untouched on failure.
    pub fn save(&self, record: &IdentityRecord, key: &SymmetricKey) -> VaultResult<VaultBlob> {
        let envelope = StoredIdentityRef {
            record,
            updated_at: current_unix_timestamp()?,
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(&envelope)?);
        let (iv, ciphertext) = cipher::encrypt(key, &plaintext)?;
        let blob = VaultBlob::new(iv, ciphertext);

        self.store.set(&self.storage_key, blob.encode().as_bytes())?;
        self.session.set(Some(key.clone()));
        log::debug!("vault saved under `{}`", self.storage_key);
        Ok(blob)
    }

    /// Loads and decrypts the persisted identity.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if a vault exists and opens under `key`
    /// - `Ok(None)` if no vault is persisted
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Decryption`] if authentication fails or the
    /// decrypted payload is not a valid identity; never a partial record.
    pub fn load(&self, key: &SymmetricKey) -> VaultResult<Option<IdentityRecord>> {
        Ok(self.load_with_metadata(key)?.map(|loaded| loaded.record))
    }

    /// Like [`Vault::load`], also returning the envelope timestamp.
    ///
    /// # Errors
    ///
    /// See [`Vault::load`].
    pub fn load_with_metadata(&self, key: &SymmetricKey) -> VaultResult<Option<LoadedIdentity>> {
        let Some(encoded) = self.store.get(&self.storage_key)? else {
            return Ok(None);
        };
        let blob = VaultBlob::decode(&encoded)?;
        let plaintext = Zeroizing::new(cipher::decrypt(key, blob.iv(), blob.ciphertext())?);

        // Authenticated but unparseable means the writer was broken; treat it
        // like any other corrupted vault.
        let stored: StoredIdentity = serde_json::from_slice(&plaintext).map_err(|err| {
            VaultError::Decryption(format!("vault payload is not a valid identity: {err}"))
        })?;
        let StoredIdentity { record, updated_at } = stored;
        let updated_at = updated_at.as_ref().and_then(serde_json::Value::as_u64);
        Ok(Some(LoadedIdentity { record, updated_at }))
    }

    /// Deletes the persisted blob. Purging an absent vault is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub fn purge(&self) -> VaultResult<()> {
        self.store.delete(&self.storage_key)?;
        log::debug!("vault purged from `{}`", self.storage_key);
        Ok(())
    }

    /// Whether a blob is persisted. Does not attempt decryption.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub fn exists(&self) -> VaultResult<bool> {
        self.store.exists(&self.storage_key)
    }
}

impl<S> std::fmt::Debug for Vault<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}

fn current_unix_timestamp() -> VaultResult<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| VaultError::Serialization(format!("system time before unix epoch: {err}")))?;
    Ok(duration.as_secs())
}
