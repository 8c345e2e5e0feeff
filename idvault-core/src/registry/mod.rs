//! Read-only view of the on-chain verification registry.
//!
//! The registry is owned by external contracts. This crate only reads
//! per-claim verified/revoked flags and listens for events that should
//! trigger a re-read; registration and proof submission happen elsewhere.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{VaultError, VaultResult};

mod memory;
mod watch;

pub use memory::{EventHub, MemoryRegistry};
pub use watch::VerificationWatch;

/// Chain id of a local development node.
pub const DEVELOPMENT_CHAIN_ID: u64 = 31_337;

/// A verifiable predicate tracked per address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// Holder is at least 18 years old.
    Age,
    /// Holder's nationality matches a required country.
    Nationality,
    /// Holder is enrolled at a university.
    Student,
}

/// Verified/revoked flags for one claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimState {
    /// The claim was proven on-chain.
    pub verified: bool,
    /// The claim was revoked after verification.
    pub revoked: bool,
}

/// Authoritative verification flags for one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationState {
    /// A DID is registered for the address.
    pub registered: bool,
    /// Age claim.
    pub age: ClaimState,
    /// Nationality claim.
    pub nationality: ClaimState,
    /// Student claim.
    pub student: ClaimState,
}

impl VerificationState {
    /// Flags for `kind`.
    #[must_use]
    pub const fn claim(&self, kind: ClaimKind) -> ClaimState {
        match kind {
            ClaimKind::Age => self.age,
            ClaimKind::Nationality => self.nationality,
            ClaimKind::Student => self.student,
        }
    }

    /// Mutable flags for `kind`.
    pub const fn claim_mut(&mut self, kind: ClaimKind) -> &mut ClaimState {
        match kind {
            ClaimKind::Age => &mut self.age,
            ClaimKind::Nationality => &mut self.nationality,
            ClaimKind::Student => &mut self.student,
        }
    }

    /// Every claim is verified.
    #[must_use]
    pub const fn fully_verified(&self) -> bool {
        self.age.verified && self.nationality.verified && self.student.verified
    }

    /// Any claim is revoked.
    #[must_use]
    pub const fn any_revoked(&self) -> bool {
        self.age.revoked || self.nationality.revoked || self.student.revoked
    }

    /// Display status derived from the flags.
    ///
    /// Revocation takes precedence over everything else.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        if self.any_revoked() {
            VerificationStatus::Revoked
        } else if self.fully_verified() {
            VerificationStatus::Verified
        } else if self.age.verified || self.nationality.verified || self.student.verified {
            VerificationStatus::PartiallyVerified
        } else {
            VerificationStatus::Unverified
        }
    }
}

/// Summary status shown to the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// No claim is verified.
    Unverified,
    /// Some but not all claims are verified.
    PartiallyVerified,
    /// All claims are verified.
    Verified,
    /// At least one claim was revoked.
    Revoked,
}

/// Read-only query surface of the verification registry.
pub trait VerificationRegistry: Send + Sync {
    /// Chain id the registry is deployed on.
    fn chain_id(&self) -> impl Future<Output = VaultResult<u64>> + Send;

    /// Current flags for `address`.
    fn verification_state(
        &self,
        address: &str,
    ) -> impl Future<Output = VaultResult<VerificationState>> + Send;
}

/// Refuses to read from a registry on an unexpected chain.
///
/// # Errors
///
/// Returns [`VaultError::InvalidInput`] if no chain id is configured and
/// [`VaultError::WrongNetwork`] if the registry reports a different one.
pub async fn ensure_network<R: VerificationRegistry>(
    registry: &R,
    expected_chain_id: Option<u64>,
) -> VaultResult<()> {
    let expected = expected_chain_id.ok_or_else(|| {
        VaultError::invalid_input("chain_id", "expected chain id is not configured")
    })?;
    let found = registry.chain_id().await?;
    if found != expected {
        log::warn!("registry on chain {found}, expected {expected}");
        return Err(VaultError::WrongNetwork { expected, found });
    }
    Ok(())
}

/// Registry event kinds that change an address's verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RegistryEventKind {
    /// `IdentityRegistered(user, did)`
    IdentityRegistered,
    /// `ClaimVerified(user, claim)`
    ClaimVerified,
    /// `ClaimRevoked(user, claim)`
    ClaimRevoked,
}

/// An event emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    /// What happened.
    pub kind: RegistryEventKind,
    /// The affected address.
    pub address: String,
    /// The affected claim, for claim events.
    pub claim: Option<ClaimKind>,
}

impl RegistryEvent {
    /// Whether the event concerns `address` (case-insensitive).
    #[must_use]
    pub fn concerns(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// Identifies one subscription on a [`RegistryEvents`] feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked for each registry event.
pub type EventCallback = Box<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Event feed of the registry.
///
/// Callbacks run on the feed's delivery thread and must not block.
pub trait RegistryEvents: Send + Sync {
    /// Registers `callback` for every subsequent event.
    fn subscribe(&self, callback: EventCallback) -> SubscriptionId;

    /// Removes a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;
    use test_case::test_case;

    use super::*;

    fn verified() -> ClaimState {
        ClaimState {
            verified: true,
            revoked: false,
        }
    }

    #[test_case(VerificationState::default(), VerificationStatus::Unverified ; "nothing verified")]
    #[test_case(VerificationState { age: verified(), ..Default::default() }, VerificationStatus::PartiallyVerified ; "one claim")]
    #[test_case(VerificationState { registered: true, age: verified(), nationality: verified(), student: verified() }, VerificationStatus::Verified ; "all claims")]
    #[test_case(VerificationState { age: verified(), nationality: verified(), student: ClaimState { verified: true, revoked: true }, registered: true }, VerificationStatus::Revoked ; "revocation wins")]
    fn test_status_derivation(state: VerificationState, expected: VerificationStatus) {
        assert_eq!(state.status(), expected);
    }

    #[test]
    fn test_claim_accessors() {
        let mut state = VerificationState::default();
        for kind in ClaimKind::iter() {
            state.claim_mut(kind).verified = true;
            assert!(state.claim(kind).verified);
        }
        assert!(state.fully_verified());
    }

    #[test]
    fn test_claim_kind_parsing() {
        assert_eq!(ClaimKind::from_str("age").unwrap(), ClaimKind::Age);
        assert_eq!(ClaimKind::Student.to_string(), "student");
        assert!(ClaimKind::from_str("university").is_err());
    }

    #[test]
    fn test_event_address_match_is_case_insensitive() {
        let event = RegistryEvent {
            kind: RegistryEventKind::ClaimVerified,
            address: "0xABCDEF".to_string(),
            claim: Some(ClaimKind::Age),
        };
        assert!(event.concerns("0xabcdef"));
        assert!(!event.concerns("0xabcde0"));
    }
}
