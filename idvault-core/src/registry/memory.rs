//! In-memory registry and event feed.
//!
//! Stands in for the deployed contracts in tests and local tooling. The
//! mutating helpers simulate what the external registration and proof
//! services do on-chain; the vault controller never calls them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ClaimKind, EventCallback, RegistryEvent, RegistryEventKind, RegistryEvents, SubscriptionId,
    VerificationRegistry, VerificationState,
};
use crate::error::{VaultError, VaultResult};

type SharedCallback = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Synchronous fan-out event feed.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, SharedCallback>>,
}

impl EventHub {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<u64, SharedCallback>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `event` to every current subscriber.
    pub fn emit(&self, event: &RegistryEvent) {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<SharedCallback> = self.subscribers().values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl RegistryEvents for EventHub {
    fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers().insert(id, Arc::from(callback));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers().remove(&id.0);
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// In-memory [`VerificationRegistry`] with an attached [`EventHub`].
#[derive(Debug)]
pub struct MemoryRegistry {
    chain_id: u64,
    states: Mutex<HashMap<String, VerificationState>>,
    events: Arc<EventHub>,
}

impl MemoryRegistry {
    /// Creates an empty registry reporting `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            states: Mutex::new(HashMap::new()),
            events: Arc::new(EventHub::new()),
        }
    }

    /// The event feed of this registry.
    #[must_use]
    pub fn events(&self) -> Arc<EventHub> {
        Arc::clone(&self.events)
    }

    fn update(
        &self,
        address: &str,
        kind: RegistryEventKind,
        claim: Option<ClaimKind>,
        apply: impl FnOnce(&mut VerificationState),
    ) {
        {
            let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
            apply(states.entry(address.to_ascii_lowercase()).or_default());
        }
        self.events.emit(&RegistryEvent {
            kind,
            address: address.to_string(),
            claim,
        });
    }

    /// Marks `address` as registered and emits `IdentityRegistered`.
    pub fn register(&self, address: &str) {
        self.update(address, RegistryEventKind::IdentityRegistered, None, |state| {
            state.registered = true;
        });
    }

    /// Marks a claim verified and emits `ClaimVerified`.
    pub fn verify_claim(&self, address: &str, kind: ClaimKind) {
        self.update(address, RegistryEventKind::ClaimVerified, Some(kind), |state| {
            let claim = state.claim_mut(kind);
            claim.verified = true;
            claim.revoked = false;
        });
    }

    /// Marks a claim revoked and emits `ClaimRevoked`.
    pub fn revoke_claim(&self, address: &str, kind: ClaimKind) {
        self.update(address, RegistryEventKind::ClaimRevoked, Some(kind), |state| {
            state.claim_mut(kind).revoked = true;
        });
    }
}

impl VerificationRegistry for MemoryRegistry {
    async fn chain_id(&self) -> VaultResult<u64> {
        Ok(self.chain_id)
    }

    async fn verification_state(&self, address: &str) -> VaultResult<VerificationState> {
        if address.is_empty() {
            return Err(VaultError::invalid_input("address", "address is empty"));
        }
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(states
            .get(&address.to_ascii_lowercase())
            .copied()
            .unwrap_or_default())
    }
}
