//! Key derivation from wallet signatures.
//!
//! The vault key is never the raw signature. The wallet's signature string is
//! first hashed with keccak256, and the `0x`-prefixed lowercase hex of that
//! digest is hardened with HKDF-SHA256:
//!
//! ```text
//! K_vault = HKDF-SHA256(
//!     ikm  = utf8("0x" || hex(keccak256(utf8(signature)))),
//!     salt = "extreme-emerald-v1-salt",
//!     info = "identity-vault-key",
//!     len  = 32
//! )
//! ```
//!
//! This is the derivation the web client performs, so a vault it wrote under
//! the same wallet opens here.

use alloy_primitives::keccak256;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::key::{SymmetricKey, KEY_SIZE};
use crate::error::{VaultError, VaultResult};

/// Default HKDF salt.
pub const DEFAULT_KDF_SALT: &[u8] = b"extreme-emerald-v1-salt";

/// Default HKDF info label.
pub const DEFAULT_KDF_INFO: &[u8] = b"identity-vault-key";

/// Domain separation parameters for HKDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// HKDF extract salt.
    pub salt: Vec<u8>,
    /// HKDF expand info.
    pub info: Vec<u8>,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: DEFAULT_KDF_SALT.to_vec(),
            info: DEFAULT_KDF_INFO.to_vec(),
        }
    }
}

/// Derives the vault key from secret material using the default labels.
///
/// # Errors
///
/// Returns [`VaultError::Derivation`] if `secret_material` is empty.
pub fn derive_key(secret_material: &[u8]) -> VaultResult<SymmetricKey> {
    derive_key_with(secret_material, &KdfParams::default())
}

/// Input key material for a wallet signature: `0x`-prefixed lowercase hex of
/// keccak256 over the signature bytes.
#[must_use]
pub fn wallet_key_material(signature: &[u8]) -> Zeroizing<String> {
    Zeroizing::new(format!("0x{}", hex::encode(keccak256(signature))))
}

/// Derives the vault key from a wallet signature string.
///
/// The signature is taken exactly as the wallet returned it (typically
/// `0x`-prefixed hex) and pre-hashed with [`wallet_key_material`].
///
/// # Errors
///
/// Returns [`VaultError::Derivation`] if the signature is blank.
pub fn derive_key_from_signature(
    signature: &str,
    params: &KdfParams,
) -> VaultResult<SymmetricKey> {
    if signature.trim().is_empty() {
        return Err(VaultError::Derivation("signature is blank".to_string()));
    }
    derive_key_with(wallet_key_material(signature.as_bytes()).as_bytes(), params)
}

/// Derives the vault key from wallet signature bytes held in a secret buffer.
///
/// Same derivation as [`derive_key_from_signature`].
///
/// # Errors
///
/// Returns [`VaultError::Derivation`] if the signature is empty.
pub fn derive_key_from_wallet_signature(
    signature: &SecretSlice<u8>,
    params: &KdfParams,
) -> VaultResult<SymmetricKey> {
    let signature = signature.expose_secret();
    if signature.is_empty() {
        return Err(VaultError::Derivation("signature is empty".to_string()));
    }
    derive_key_with(wallet_key_material(signature).as_bytes(), params)
}

/// Derives the vault key from secret material with explicit domain labels.
///
/// # Errors
///
/// Returns [`VaultError::Derivation`] if `secret_material` is empty or HKDF
/// refuses the output length.
pub fn derive_key_with(
    secret_material: &[u8],
    params: &KdfParams,
) -> VaultResult<SymmetricKey> {
    if secret_material.is_empty() {
        return Err(VaultError::Derivation(
            "secret material is empty".to_string(),
        ));
    }

    let hkdf = Hkdf::<Sha256>::new(Some(&params.salt), secret_material);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(&params.info, &mut okm)
        .map_err(|err| VaultError::Derivation(err.to_string()))?;

    Ok(SymmetricKey::from_bytes(okm))
}
