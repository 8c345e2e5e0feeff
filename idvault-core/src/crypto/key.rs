//! Symmetric key material for the identity vault.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a vault key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Symmetric key (256-bit) protecting the identity vault.
///
/// Derived from a wallet signature by [`derive_key`](super::derive_key) and
/// held only in memory.
///
/// # Security
///
/// - The key is zeroized on drop to prevent memory leaks.
/// - The key should never be logged or serialized in plaintext.
/// - Equality is evaluated in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SymmetricKey {}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_SIZE]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.to_lowercase().contains("ab, ab"));
    }

    #[test]
    fn test_equality() {
        let a = SymmetricKey::from_bytes([1; KEY_SIZE]);
        let b = SymmetricKey::from_bytes([1; KEY_SIZE]);
        let c = SymmetricKey::from_bytes([2; KEY_SIZE]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
