//! Persisted ciphertext container.
//!
//! Layout, base64 encoded (standard alphabet, padded) for string-oriented
//! stores:
//!
//! ```text
//! IV (12 bytes) || ciphertext || GCM tag (16 bytes)
//! ```
//!
//! There is no version byte; the layout is byte-compatible with vaults
//! written by the web client.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::cipher::{IV_SIZE, TAG_SIZE};
use crate::error::{VaultError, VaultResult};

/// Encrypted identity as persisted in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultBlob {
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
}

impl VaultBlob {
    pub(crate) const fn new(iv: [u8; IV_SIZE], ciphertext: Vec<u8>) -> Self {
        Self { iv, ciphertext }
    }

    /// The initialization vector used for this blob.
    #[must_use]
    pub const fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Ciphertext with the authentication tag appended.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Returns `IV || ciphertext`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Splits raw `IV || ciphertext` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Decryption`] if the input is too short to hold
    /// an IV and a tag. A truncated vault is a corrupted vault.
    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        if bytes.len() < IV_SIZE + TAG_SIZE {
            return Err(VaultError::Decryption(format!(
                "vault blob too short: {} bytes",
                bytes.len()
            )));
        }
        let (iv, ciphertext) = bytes.split_at(IV_SIZE);
        let mut iv_bytes = [0u8; IV_SIZE];
        iv_bytes.copy_from_slice(iv);
        Ok(Self::new(iv_bytes, ciphertext.to_vec()))
    }

    /// Encodes the blob for storage.
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decodes a stored blob.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Decryption`] if the value is not valid base64 or
    /// is too short.
    pub fn decode(encoded: &[u8]) -> VaultResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim_ascii())
            .map_err(|err| VaultError::Decryption(format!("vault blob is not base64: {err}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_iv_then_ciphertext() {
        let blob = VaultBlob::new([1u8; IV_SIZE], vec![2u8; TAG_SIZE + 3]);
        let bytes = blob.to_bytes();
        assert_eq!(&bytes[..IV_SIZE], &[1u8; IV_SIZE]);
        assert_eq!(&bytes[IV_SIZE..], &[2u8; TAG_SIZE + 3][..]);
        assert_eq!(VaultBlob::decode(blob.encode().as_bytes()).unwrap(), blob);
    }

    #[test]
    fn test_rejects_truncated_blob() {
        let short = STANDARD.encode([0u8; IV_SIZE + TAG_SIZE - 1]);
        assert!(matches!(
            VaultBlob::decode(short.as_bytes()),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(matches!(
            VaultBlob::decode(b"not*base64!"),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn test_ignores_trailing_newline() {
        let blob = VaultBlob::new([9u8; IV_SIZE], vec![3u8; TAG_SIZE]);
        let mut encoded = blob.encode().into_bytes();
        encoded.push(b'\n');
        assert_eq!(VaultBlob::decode(&encoded).unwrap(), blob);
    }
}
