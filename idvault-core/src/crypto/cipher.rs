//! Authenticated encryption for the vault.
//!
//! AES-256-GCM with a 96-bit IV drawn from the OS RNG on every call. The IV
//! is returned to the caller and travels next to the ciphertext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use super::key::SymmetricKey;
use crate::error::{VaultError, VaultResult};

/// Size of the AES-GCM initialization vector in bytes.
pub const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypts `plaintext` under `key` with a fresh random IV.
///
/// # Returns
///
/// A tuple of (IV, ciphertext with auth tag appended).
///
/// # Errors
///
/// Returns [`VaultError::Encryption`] if the AEAD refuses the input.
pub fn encrypt(
    key: &SymmetricKey,
    plaintext: &[u8],
) -> VaultResult<([u8; IV_SIZE], Vec<u8>)> {
    let iv = generate_iv();
    let ciphertext = cipher_for(key)
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| VaultError::Encryption("AES-GCM encryption failed".to_string()))?;
    Ok((iv, ciphertext))
}

/// Decrypts and authenticates `ciphertext` under `key`.
///
/// # Errors
///
/// Returns [`VaultError::Decryption`] if authentication fails (wrong key,
/// tampered IV, tampered ciphertext or tag).
pub fn decrypt(
    key: &SymmetricKey,
    iv: &[u8; IV_SIZE],
    ciphertext: &[u8],
) -> VaultResult<Vec<u8>> {
    cipher_for(key)
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| VaultError::Decryption("AES-GCM authentication failed".to_string()))
}
