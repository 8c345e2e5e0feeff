//! Common test utilities shared across integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use idvault_core::storage::{KeyValueStore, MemoryStore};
use idvault_core::{
    IdentityController, IdentityRecord, SessionKeyCache, SignerError, VaultConfig, VaultError,
    VaultResult, WalletSigner,
};

/// Wallet that replays queued answers, then reports itself unavailable.
#[allow(dead_code, reason = "used in tests")]
#[derive(Default)]
pub struct ScriptedSigner {
    answers: Mutex<VecDeque<Result<String, SignerError>>>,
    calls: AtomicUsize,
}

#[allow(dead_code, reason = "used in tests")]
impl ScriptedSigner {
    /// Queues `answers`, returned one per signing request.
    pub fn new<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Result<&'static str, SignerError>>,
    {
        Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|answer| answer.map(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of signing requests seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WalletSigner for ScriptedSigner {
    async fn sign_message(&self, _message: &str) -> Result<Vec<u8>, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .answers
            .lock()
            .expect("signer lock")
            .pop_front()
            .unwrap_or_else(|| Err(SignerError::Unavailable("wallet closed".to_string())));
        answer.map(String::into_bytes)
    }
}

/// Store whose writes or deletes can be switched to fail.
#[allow(dead_code, reason = "used in tests")]
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

#[allow(dead_code, reason = "used in tests")]
impl FlakyStore {
    /// Makes every `set` fail with a storage error while `fail` is true.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every `delete` fail with a storage error while `fail` is true.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> VaultResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VaultError::Storage("quota exceeded".to_string()));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(VaultError::Storage("device busy".to_string()));
        }
        self.inner.delete(key)
    }
}

/// A valid record with every field set.
#[allow(dead_code, reason = "used in tests")]
pub fn sample_record() -> IdentityRecord {
    IdentityRecord::new(20_000_229, 356, 1001, Some(12_345)).expect("valid record")
}

/// Controller over `store` with the default configuration.
#[allow(dead_code, reason = "used in tests")]
pub fn controller<S, W>(
    store: S,
    signer: W,
    session: &Arc<SessionKeyCache>,
) -> IdentityController<S, W>
where
    S: KeyValueStore,
    W: WalletSigner,
{
    IdentityController::new(store, signer, Arc::clone(session), VaultConfig::default())
        .expect("controller")
}
