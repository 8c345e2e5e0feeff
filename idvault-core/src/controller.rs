//! Identity lifecycle: create, unlock, logout and purge.
//!
//! The controller is the only component that holds a decrypted
//! [`IdentityRecord`], and only while [`IdentityState::Unlocked`]. Every
//! transition away from `Unlocked` drops (and thereby zeroizes) the record.

use std::sync::Arc;

use secrecy::SecretSlice;
use strum::Display;

use crate::config::VaultConfig;
use crate::crypto::{derive_key_from_wallet_signature, KdfParams, SymmetricKey};
use crate::error::{VaultError, VaultResult};
use crate::identity::IdentityRecord;
use crate::proof::{ProofReceipt, ProofSubmitter, WitnessInputs};
use crate::registry::{
    ensure_network, ClaimKind, RegistryEvents, VerificationRegistry, VerificationStatus,
    VerificationWatch,
};
use crate::session::SessionKeyCache;
use crate::signer::WalletSigner;
use crate::storage::KeyValueStore;
use crate::vault::Vault;

/// Lifecycle state of the local identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum IdentityState {
    /// No vault is persisted.
    NoIdentity,
    /// A vault is persisted but not decrypted.
    Locked,
    /// The vault is decrypted and the record is held in memory.
    Unlocked,
    /// The last create or purge failed. Leave with
    /// [`IdentityController::recover`] or [`IdentityController::purge`].
    Error,
}

/// Orchestrates the vault lifecycle for one holder.
///
/// Operations take `&mut self`, so the state machine is never driven
/// concurrently. The [`SessionKeyCache`] is shared and may outlive the
/// controller, which lets a later controller unlock without prompting.
pub struct IdentityController<S, W> {
    vault: Vault<S>,
    signer: W,
    session: Arc<SessionKeyCache>,
    config: VaultConfig,
    kdf: KdfParams,
    events: Option<Arc<dyn RegistryEvents>>,
    state: IdentityState,
    record: Option<IdentityRecord>,
}

impl<S: KeyValueStore, W: WalletSigner> IdentityController<S, W> {
    /// Creates a controller over `store`.
    ///
    /// The initial state is [`IdentityState::Locked`] if a vault is persisted
    /// under the configured storage key, else [`IdentityState::NoIdentity`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store cannot be queried.
    pub fn new(
        store: S,
        signer: W,
        session: Arc<SessionKeyCache>,
        config: VaultConfig,
    ) -> VaultResult<Self> {
        let vault = Vault::new(store, Arc::clone(&session))
            .with_storage_key(config.storage_key.clone());
        let state = if vault.exists()? {
            IdentityState::Locked
        } else {
            IdentityState::NoIdentity
        };
        log::debug!("identity controller starting in state {state}");

        Ok(Self {
            vault,
            signer,
            session,
            kdf: config.kdf_params(),
            config,
            events: None,
            state,
            record: None,
        })
    }

    /// Attaches the registry event feed used by
    /// [`IdentityController::watch_verification`].
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn RegistryEvents>) -> Self {
        self.events = Some(events);
        self
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> IdentityState {
        self.state
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Borrows the decrypted record.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] unless unlocked.
    pub fn record(&self) -> VaultResult<&IdentityRecord> {
        match (&self.state, &self.record) {
            (IdentityState::Unlocked, Some(record)) => Ok(record),
            _ => Err(self.invalid_state("read the identity")),
        }
    }

    /// Seals `record` into a new vault and unlocks it.
    ///
    /// Prompts the wallet for a signature, derives the vault key, encrypts
    /// and persists the record and caches the key for the session.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidState`] if a vault already exists; purge it first.
    /// - The signer, derivation or storage error that stopped creation. The
    ///   controller is then in [`IdentityState::Error`] and nothing was persisted.
    pub async fn create(&mut self, record: IdentityRecord) -> VaultResult<()> {
        if !matches!(self.state, IdentityState::NoIdentity | IdentityState::Error) {
            return Err(self.invalid_state("create an identity"));
        }
        match self.vault.exists() {
            Ok(false) => {}
            Ok(true) => return Err(self.invalid_state("create an identity")),
            Err(err) => return Err(self.fail("create", err)),
        }

        let key = match self.request_key().await {
            Ok(key) => key,
            Err(err) => return Err(self.fail("create", err)),
        };
        if let Err(err) = self.vault.save(&record, &key) {
            return Err(self.fail("create", err));
        }

        self.record = Some(record);
        self.state = IdentityState::Unlocked;
        log::info!("identity vault created");
        Ok(())
    }

    /// Decrypts the persisted vault.
    ///
    /// A key cached for this session is tried first without prompting. A
    /// cached key that no longer opens the vault is discarded, so the next
    /// attempt prompts the wallet.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidState`] unless locked.
    /// - [`VaultError::SigningRejected`] or [`VaultError::Signer`] if the
    ///   wallet did not sign; the vault stays locked.
    /// - [`VaultError::Decryption`] if the key does not open the vault; the
    ///   vault stays locked.
    /// - [`VaultError::NotFound`] if the vault disappeared; the controller
    ///   moves to [`IdentityState::NoIdentity`].
    pub async fn unlock(&mut self) -> VaultResult<()> {
        if self.state != IdentityState::Locked {
            return Err(self.invalid_state("unlock"));
        }

        let key = if let Some(key) = self.session.get() {
            log::debug!("unlocking with cached session key");
            key
        } else {
            self.request_key().await?
        };

        match self.vault.load(&key) {
            Ok(Some(record)) => {
                self.session.set(Some(key));
                self.record = Some(record);
                self.state = IdentityState::Unlocked;
                log::info!("identity vault unlocked");
                Ok(())
            }
            Ok(None) => {
                self.session.clear();
                self.state = IdentityState::NoIdentity;
                log::warn!("vault disappeared before unlock");
                Err(VaultError::NotFound)
            }
            Err(err) => {
                if matches!(err, VaultError::Decryption(_)) {
                    self.session.clear();
                }
                log::warn!("unlock failed: {err}");
                Err(err)
            }
        }
    }

    /// Drops the decrypted record and the session key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] unless unlocked.
    pub fn logout(&mut self) -> VaultResult<()> {
        if self.state != IdentityState::Unlocked {
            return Err(self.invalid_state("log out"));
        }
        self.record = None;
        self.session.clear();
        self.state = IdentityState::Locked;
        log::info!("identity vault locked");
        Ok(())
    }

    /// Deletes the vault and forgets all key material. Allowed in any state.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the blob could not be deleted; the
    /// controller is then in [`IdentityState::Error`]. Memory is cleared
    /// either way.
    pub fn purge(&mut self) -> VaultResult<()> {
        self.record = None;
        self.session.clear();
        if let Err(err) = self.vault.purge() {
            return Err(self.fail("purge", err));
        }
        self.state = IdentityState::NoIdentity;
        log::info!("identity vault purged");
        Ok(())
    }

    /// Leaves [`IdentityState::Error`] by re-reading whether a vault exists.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] outside the error state and
    /// [`VaultError::Storage`] if the store cannot be queried.
    pub fn recover(&mut self) -> VaultResult<IdentityState> {
        if self.state != IdentityState::Error {
            return Err(self.invalid_state("recover"));
        }
        self.state = if self.vault.exists()? {
            IdentityState::Locked
        } else {
            IdentityState::NoIdentity
        };
        log::debug!("recovered into state {}", self.state);
        Ok(self.state)
    }

    /// Re-encrypts the unlocked record under the session key with a fresh IV.
    ///
    /// Prompts the wallet if the shared session key was cleared elsewhere.
    /// A freshly derived key must open the persisted vault before it is used,
    /// so a different wallet can never re-key it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidState`] unless unlocked.
    /// - [`VaultError::Decryption`] if the re-derived key does not open the
    ///   persisted vault; nothing is written.
    /// - [`VaultError::NotFound`] if the vault disappeared.
    /// - The signer or storage error that prevented the write.
    pub async fn persist(&mut self) -> VaultResult<()> {
        if self.state != IdentityState::Unlocked {
            return Err(self.invalid_state("persist"));
        }
        let key = match self.session.get() {
            Some(key) => key,
            None => {
                let key = self.request_key().await?;
                self.vault.load(&key)?.ok_or(VaultError::NotFound)?;
                key
            }
        };
        let record = self.record()?;
        self.vault.save(record, &key)?;
        Ok(())
    }

    /// Reads the authoritative verification state of `address`.
    ///
    /// When unlocked, the record's cached verification hints are updated in
    /// memory; call [`IdentityController::persist`] to keep them. The ledger
    /// is never written.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidInput`] if no chain id is configured.
    /// - [`VaultError::WrongNetwork`] if the registry is on another chain.
    /// - Any error reported by the registry.
    pub async fn refresh_verification<R: VerificationRegistry>(
        &mut self,
        registry: &R,
        address: &str,
    ) -> VaultResult<VerificationStatus> {
        ensure_network(registry, self.config.expected_chain_id).await?;
        let verification = registry.verification_state(address).await?;

        if let (IdentityState::Unlocked, Some(record)) = (self.state, self.record.as_mut()) {
            record.set_verification_hints(
                verification.claim(ClaimKind::Age).verified,
                verification.claim(ClaimKind::Nationality).verified,
                verification.claim(ClaimKind::Student).verified,
            );
        }

        let status = verification.status();
        log::debug!("verification status for {address}: {status}");
        Ok(status)
    }

    /// Subscribes to registry events concerning `address`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidInput`] if `address` is empty or no event
    /// feed was attached with [`IdentityController::with_events`].
    pub fn watch_verification(&self, address: &str) -> VaultResult<VerificationWatch> {
        if address.trim().is_empty() {
            return Err(VaultError::invalid_input("address", "address is empty"));
        }
        let events = self.events.as_ref().ok_or_else(|| {
            VaultError::invalid_input("events", "no registry event feed attached")
        })?;
        Ok(VerificationWatch::subscribe(Arc::clone(events), address))
    }

    /// Proves `kind` from the unlocked record through an external submitter.
    ///
    /// `today` is the proving date as `YYYYMMDD`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidState`] unless unlocked, or the
    /// submitter's error.
    pub async fn prove<P: ProofSubmitter>(
        &self,
        kind: ClaimKind,
        today: u32,
        submitter: &P,
    ) -> VaultResult<ProofReceipt> {
        let inputs = WitnessInputs::for_claim(self.record()?, kind, today);
        log::info!("submitting {} proof", kind.circuit_name());
        let tx_hash = submitter.prove_and_submit(kind, &inputs).await?;
        log::info!("{kind} proof submitted in {tx_hash}");
        Ok(ProofReceipt { kind, tx_hash })
    }

    async fn request_key(&self) -> VaultResult<SymmetricKey> {
        let signature = self
            .signer
            .sign_message(&self.config.signing_message)
            .await?;
        let signature = SecretSlice::from(signature);
        derive_key_from_wallet_signature(&signature, &self.kdf)
    }

    fn fail(&mut self, operation: &str, err: VaultError) -> VaultError {
        self.record = None;
        self.state = IdentityState::Error;
        log::warn!("{operation} failed: {err}");
        err
    }

    fn invalid_state(&self, operation: &'static str) -> VaultError {
        VaultError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

impl<S, W> std::fmt::Debug for IdentityController<S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityController")
            .field("state", &self.state)
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}
