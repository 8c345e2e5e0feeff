//! Witness inputs for the external claim circuits.
//!
//! Proving and on-chain submission are owned by an external service. This
//! module only shapes the private witness from an unlocked identity, using
//! the signal names the compiled circuits expect.

use std::future::Future;

use rand::{rngs::OsRng, Rng};
use ruint::aliases::U256;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::VaultResult;
use crate::identity::IdentityRecord;
use crate::registry::ClaimKind;

/// Minimum age proven by the age circuit.
pub const MINIMUM_AGE: u32 = 18;

/// Upper bound (exclusive) of the per-proof nonce.
const NONCE_BOUND: u32 = 1_000_000;

impl ClaimKind {
    /// Name of the compiled circuit proving this claim.
    #[must_use]
    pub const fn circuit_name(self) -> &'static str {
        match self {
            Self::Age => "age_verification",
            Self::Nationality => "nationality_verification",
            Self::Student => "student_verification",
        }
    }

    /// Registry method that verifies a proof for this claim.
    #[must_use]
    pub const fn verifier_method(self) -> &'static str {
        match self {
            Self::Age => "verifyAge",
            Self::Nationality => "verifyNationality",
            Self::Student => "verifyStudent",
        }
    }
}

/// Private witness for one claim circuit.
///
/// Holds personal fields; zeroized on drop and never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WitnessInputs {
    dob: u32,
    nationality: u16,
    student_id: u64,
    user_salt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_hash: Option<String>,
    nonce: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_date: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_country: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    university_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_university: Option<u32>,
}

impl WitnessInputs {
    /// Builds the witness for `kind` with a random nonce.
    ///
    /// `today` is the proving date as `YYYYMMDD`, used by the age circuit.
    #[must_use]
    pub fn for_claim(record: &IdentityRecord, kind: ClaimKind, today: u32) -> Self {
        Self::with_nonce(record, kind, today, OsRng.gen_range(0..NONCE_BOUND))
    }

    /// Builds the witness for `kind` with an explicit nonce.
    #[must_use]
    pub fn with_nonce(record: &IdentityRecord, kind: ClaimKind, today: u32, nonce: u32) -> Self {
        let mut inputs = Self {
            dob: record.dob(),
            nationality: record.nationality(),
            student_id: record.student_id().unwrap_or(0),
            user_salt: U256::from_be_bytes(*record.salt().as_bytes()).to_string(),
            identity_hash: record
                .identity_hash()
                .map(|hash| U256::from_be_bytes(*hash.as_bytes()).to_string()),
            nonce,
            current_date: None,
            min_age: None,
            required_country: None,
            university_code: None,
            expected_university: None,
        };
        match kind {
            ClaimKind::Age => {
                inputs.current_date = Some(today);
                inputs.min_age = Some(MINIMUM_AGE);
            }
            ClaimKind::Nationality => {
                inputs.required_country = Some(record.nationality());
            }
            ClaimKind::Student => {
                inputs.university_code = Some(record.university());
                inputs.expected_university = Some(record.university());
            }
        }
        inputs
    }

    /// The per-proof nonce.
    #[must_use]
    pub const fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Serializes the witness as the JSON object the prover consumes.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Serialization`](crate::VaultError::Serialization)
    /// if encoding fails.
    pub fn to_json(&self) -> VaultResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl std::fmt::Debug for WitnessInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WitnessInputs")
            .field("fields", &"[REDACTED]")
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// Outcome of a submitted proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofReceipt {
    /// The proven claim.
    pub kind: ClaimKind,
    /// Hash of the verification transaction.
    pub tx_hash: String,
}

/// External service that proves a claim and submits it to the registry.
pub trait ProofSubmitter: Send + Sync {
    /// Generates a proof for `kind` from `inputs`, submits it, and returns
    /// the transaction hash once mined.
    fn prove_and_submit(
        &self,
        kind: ClaimKind,
        inputs: &WitnessInputs,
    ) -> impl Future<Output = VaultResult<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Salt;

    fn record() -> IdentityRecord {
        let mut salt = [0u8; 32];
        salt[31] = 0x2a;
        IdentityRecord::with_salt(19_990_101, 2, 1001, None, Salt::from_bytes(salt)).unwrap()
    }

    #[test]
    fn test_age_witness_shape() {
        let inputs = WitnessInputs::with_nonce(&record(), ClaimKind::Age, 20_260_101, 7);
        let json = inputs.to_json().unwrap();
        assert_eq!(json["dob"], 19_990_101);
        assert_eq!(json["studentId"], 0);
        assert_eq!(json["userSalt"], "42");
        assert_eq!(json["currentDate"], 20_260_101);
        assert_eq!(json["minAge"], 18);
        assert_eq!(json["nonce"], 7);
        assert!(json.get("requiredCountry").is_none());
    }

    #[test]
    fn test_claim_specific_fields() {
        let nationality = WitnessInputs::with_nonce(&record(), ClaimKind::Nationality, 0, 1)
            .to_json()
            .unwrap();
        assert_eq!(nationality["requiredCountry"], 2);
        assert!(nationality.get("minAge").is_none());

        let student = WitnessInputs::with_nonce(&record(), ClaimKind::Student, 0, 1)
            .to_json()
            .unwrap();
        assert_eq!(student["universityCode"], 1001);
        assert_eq!(student["expectedUniversity"], 1001);
    }

    #[test]
    fn test_nonce_in_range() {
        for _ in 0..32 {
            assert!(WitnessInputs::for_claim(&record(), ClaimKind::Age, 0).nonce() < NONCE_BOUND);
        }
    }

    #[test]
    fn test_circuit_names() {
        assert_eq!(ClaimKind::Age.circuit_name(), "age_verification");
        assert_eq!(ClaimKind::Student.verifier_method(), "verifyStudent");
    }

    #[test]
    fn test_debug_is_redacted() {
        let rendered = format!("{:?}", WitnessInputs::with_nonce(&record(), ClaimKind::Age, 0, 1));
        assert!(!rendered.contains("19990101"));
    }
}
