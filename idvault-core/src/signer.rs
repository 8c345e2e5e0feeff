//! Wallet signing capability.
//!
//! The vault key is bound to a signature over a fixed message, so access
//! control rides on the wallet's private key and the same wallet reproduces
//! the same key in every session.

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::error::VaultError;

/// Message the wallet signs to unlock the vault.
///
/// Creation and unlock MUST sign the same message; a different message
/// yields a different key.
pub const DEFAULT_SIGNING_MESSAGE: &str = "Sign this message to encrypt/decrypt your ZK Identity locally. This session-locked vault is highly secure.";

/// Failures reported by a wallet signer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user declined or dismissed the prompt.
    #[error("signature request rejected")]
    Rejected,
    /// The wallet is unreachable or failed.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

impl From<SignerError> for VaultError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::Rejected => Self::SigningRejected,
            SignerError::Unavailable(reason) => Self::Signer(reason),
        }
    }
}

/// External wallet that can sign a message.
///
/// The returned bytes are treated as opaque secret material. The core
/// imposes no deadline: a pending prompt stays pending until the wallet
/// answers or the caller drops the future.
pub trait WalletSigner: Send + Sync {
    /// Signs `message`, returning the signature as the wallet encodes it
    /// (for EIP-191 wallets, the UTF-8 bytes of the `0x`-prefixed hex string).
    fn sign_message(
        &self,
        message: &str,
    ) -> impl Future<Output = Result<Vec<u8>, SignerError>> + Send;
}

/// Signer that answers every request with a fixed signature.
///
/// Backs the CLI, where the signature is produced by an external wallet and
/// passed in, and tests.
pub struct StaticSigner {
    signature: SecretString,
}

impl StaticSigner {
    /// Creates a signer returning `signature`.
    #[must_use]
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: SecretString::from(signature.into()),
        }
    }
}

impl std::fmt::Debug for StaticSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSigner")
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

impl WalletSigner for StaticSigner {
    async fn sign_message(&self, _message: &str) -> Result<Vec<u8>, SignerError> {
        let signature = self.signature.expose_secret();
        if signature.is_empty() {
            return Err(SignerError::Unavailable("no signature configured".to_string()));
        }
        Ok(signature.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_signer_returns_utf8_signature() {
        let signer = StaticSigner::new("0xSIG_A");
        let signature = tokio_test::block_on(signer.sign_message(DEFAULT_SIGNING_MESSAGE));
        assert_eq!(signature.unwrap(), b"0xSIG_A".to_vec());
    }

    #[test]
    fn test_empty_static_signer_is_unavailable() {
        let signer = StaticSigner::new("");
        let result = tokio_test::block_on(signer.sign_message("m"));
        assert!(matches!(result, Err(SignerError::Unavailable(_))));
    }

    #[test]
    fn test_rejection_maps_to_distinct_error() {
        assert_eq!(VaultError::from(SignerError::Rejected), VaultError::SigningRejected);
        assert!(matches!(
            VaultError::from(SignerError::Unavailable("locked".to_string())),
            VaultError::Signer(_)
        ));
    }
}
