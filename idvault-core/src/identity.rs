//! The holder's identity record, its salt and its commitment.
//!
//! Field names serialize in camelCase so records round-trip with the web
//! client's JSON.

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};

/// Label for computing the identity commitment.
const LABEL_IDENTITY_COMMITMENT: &[u8] = b"idvault:identity-commitment";

/// Size of the identity salt in bytes (256-bit).
pub const SALT_SIZE: usize = 32;

/// Per-identity random salt, generated once at creation and never changed.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Zeroize, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh salt from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Creates a salt from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a salt from hex, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidInput`] if the string is not 32 bytes of hex.
    pub fn from_hex(value: &str) -> VaultResult<Self> {
        let value = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(value)
            .map_err(|err| VaultError::invalid_input("salt", err.to_string()))?;
        let bytes: [u8; SALT_SIZE] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            VaultError::invalid_input(
                "salt",
                format!("expected {SALT_SIZE} bytes, got {}", bytes.len()),
            )
        })?;
        Ok(Self(bytes))
    }

    /// Returns the salt as lowercase hex without prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the raw salt bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Salt([REDACTED])")
    }
}

impl From<Salt> for String {
    fn from(salt: Salt) -> Self {
        salt.to_hex()
    }
}

impl TryFrom<String> for Salt {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Public commitment binding the identity fields and salt.
///
/// This is the value registered on-chain. It reveals nothing about the
/// fields without the salt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Zeroize, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Returns the raw commitment bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the `0x`-prefixed hex representation.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a `0x`-prefixed (or bare) hex commitment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidInput`] if the value is not 32 bytes of hex.
    pub fn from_hex(value: &str) -> VaultResult<Self> {
        let value = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(value)
            .map_err(|err| VaultError::invalid_input("identity_hash", err.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            VaultError::invalid_input("identity_hash", "expected 32 bytes")
        })?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment({})", self.to_hex_string())
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl From<Commitment> for String {
    fn from(commitment: Commitment) -> Self {
        commitment.to_hex_string()
    }
}

impl TryFrom<String> for Commitment {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// The protected identity secret held in the vault.
///
/// Only the lifecycle controller holds a decrypted copy, and only while
/// unlocked. The record is zeroized on drop and its `Debug` output never
/// includes personal fields.
///
/// The `*_verified` flags are hints cached from the last registry read.
/// They carry no authority; display state is always re-derived from the
/// registry.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    dob: u32,
    nationality: u16,
    university: u32,
    #[serde(default, deserialize_with = "deserialize_student_id")]
    student_id: Option<u64>,
    salt: Salt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity_hash: Option<Commitment>,
    #[serde(default)]
    age_verified: bool,
    #[serde(default)]
    nationality_verified: bool,
    #[serde(default)]
    student_verified: bool,
}

/// The web client writes `0` when no student id was entered.
fn deserialize_student_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<u64>::deserialize(deserializer)?;
    Ok(value.filter(|id| *id != 0))
}

impl IdentityRecord {
    /// Creates a new identity with a freshly generated salt and commitment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidInput`] if `dob` is not a valid
    /// `YYYYMMDD` date or `nationality` is zero.
    pub fn new(
        dob: u32,
        nationality: u16,
        university: u32,
        student_id: Option<u64>,
    ) -> VaultResult<Self> {
        Self::with_salt(dob, nationality, university, student_id, Salt::generate())
    }

    /// Creates an identity with an explicit salt.
    ///
    /// Used when importing an identity whose commitment is already
    /// registered; fresh identities should use [`IdentityRecord::new`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidInput`] if the fields are invalid.
    pub fn with_salt(
        dob: u32,
        nationality: u16,
        university: u32,
        student_id: Option<u64>,
        salt: Salt,
    ) -> VaultResult<Self> {
        validate_dob(dob)?;
        if nationality == 0 {
            return Err(VaultError::invalid_input(
                "nationality",
                "nationality code must be non-zero",
            ));
        }
        let mut record = Self {
            dob,
            nationality,
            university,
            student_id: student_id.filter(|id| *id != 0),
            salt,
            identity_hash: None,
            age_verified: false,
            nationality_verified: false,
            student_verified: false,
        };
        record.identity_hash = Some(record.compute_commitment());
        Ok(record)
    }

    /// Date of birth as `YYYYMMDD`.
    #[must_use]
    pub const fn dob(&self) -> u32 {
        self.dob
    }

    /// Nationality code.
    #[must_use]
    pub const fn nationality(&self) -> u16 {
        self.nationality
    }

    /// University code.
    #[must_use]
    pub const fn university(&self) -> u32 {
        self.university
    }

    /// Student identifier, if any.
    #[must_use]
    pub const fn student_id(&self) -> Option<u64> {
        self.student_id
    }

    /// The identity salt.
    #[must_use]
    pub const fn salt(&self) -> &Salt {
        &self.salt
    }

    /// The stored identity commitment, if any.
    #[must_use]
    pub const fn identity_hash(&self) -> Option<Commitment> {
        self.identity_hash
    }

    /// Computes the identity commitment:
    ///
    /// ```text
    /// commitment = SHA256(
    ///     "idvault:identity-commitment" || dob (4 bytes BE) || nationality (2 bytes BE)
    ///     || university (4 bytes BE) || student_id (8 bytes BE, 0 if absent) || salt
    /// )
    /// ```
    #[must_use]
    pub fn compute_commitment(&self) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(LABEL_IDENTITY_COMMITMENT);
        hasher.update(self.dob.to_be_bytes());
        hasher.update(self.nationality.to_be_bytes());
        hasher.update(self.university.to_be_bytes());
        hasher.update(self.student_id.unwrap_or(0).to_be_bytes());
        hasher.update(self.salt.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Commitment(bytes)
    }

    /// Whether the stored commitment matches the current fields.
    ///
    /// `false` when no commitment is stored.
    #[must_use]
    pub fn commitment_matches(&self) -> bool {
        self.identity_hash.is_some_and(|stored| {
            stored
                .as_bytes()
                .ct_eq(self.compute_commitment().as_bytes())
                .into()
        })
    }

    /// Advisory verification hints as `(age, nationality, student)`.
    #[must_use]
    pub const fn verification_hints(&self) -> (bool, bool, bool) {
        (
            self.age_verified,
            self.nationality_verified,
            self.student_verified,
        )
    }

    pub(crate) fn set_verification_hints(&mut self, age: bool, nationality: bool, student: bool) {
        self.age_verified = age;
        self.nationality_verified = nationality;
        self.student_verified = student;
    }
}

impl std::fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("fields", &"[REDACTED]")
            .field("identity_hash", &self.identity_hash)
            .finish_non_exhaustive()
    }
}

const fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn validate_dob(dob: u32) -> VaultResult<()> {
    let year = dob / 10_000;
    let month = (dob / 100) % 100;
    let day = dob % 100;

    if !(1900..=9999).contains(&year) {
        return Err(VaultError::invalid_input(
            "dob",
            format!("year {year} out of range"),
        ));
    }
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => {
            return Err(VaultError::invalid_input(
                "dob",
                format!("month {month} out of range"),
            ))
        }
    };
    if day == 0 || day > days_in_month {
        return Err(VaultError::invalid_input(
            "dob",
            format!("day {day} out of range"),
        ));
    }
    Ok(())
}

/// Builds the `did:ethr` identifier for a wallet address.
///
/// # Errors
///
/// Returns [`VaultError::InvalidInput`] if `address` is not a `0x`-prefixed
/// 20-byte hex address.
pub fn did_for_address(address: &str) -> VaultResult<String> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| VaultError::invalid_input("address", "missing 0x prefix"))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VaultError::invalid_input(
            "address",
            "expected 20 bytes of hex",
        ));
    }
    Ok(format!("did:ethr:0x{}", hex_part.to_ascii_lowercase()))
}
