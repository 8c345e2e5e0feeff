use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Error outputs from the identity vault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Secret material was missing or malformed. Programmer error, never retried.
    #[error("derivation_error: {0}")]
    Derivation(String),
    /// Sealing the vault failed. Never caused by user input.
    #[error("encryption_error: {0}")]
    Encryption(String),
    /// Authentication failed while opening the vault (wrong key, corrupted
    /// data or tampering). The only way forward is purge-and-recreate.
    #[error("decryption_error: {0}")]
    Decryption(String),
    /// The wallet declined or the user dismissed the signing prompt.
    #[error("signing_rejected")]
    SigningRejected,
    /// The wallet could not be reached or failed for a reason other than a rejection.
    #[error("signer_error: {0}")]
    Signer(String),
    /// The persistent key-value store is unavailable.
    #[error("storage_error: {0}")]
    Storage(String),
    /// Encoding or decoding of the plaintext envelope failed.
    #[error("serialization_error: {0}")]
    Serialization(String),
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that is invalid
        attribute: String,
        /// The reason the input is invalid
        reason: String,
    },
    /// The operation is not allowed in the controller's current state.
    #[error("invalid_state: cannot {operation} while {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the controller was in.
        state: String,
    },
    /// No vault is persisted.
    #[error("vault_not_found")]
    NotFound,
    /// The registry is deployed on a different chain than the configured one.
    #[error("wrong_network: expected chain {expected}, found {found}")]
    WrongNetwork {
        /// Configured chain id.
        expected: u64,
        /// Chain id reported by the provider.
        found: u64,
    },
    /// Reading verification state from the registry failed.
    #[error("registry_error: {0}")]
    Registry(String),
    /// The external proof service failed.
    #[error("proof_error: {0}")]
    Proof(String),
}

impl VaultError {
    pub(crate) fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the user can act on the failure (retry the prompt, purge the
    /// vault or retry against storage) as opposed to a programming error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Decryption(_)
                | Self::SigningRejected
                | Self::Signer(_)
                | Self::Storage(_)
                | Self::Registry(_)
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(VaultError::Decryption("bad tag".to_string()).is_recoverable());
        assert!(VaultError::SigningRejected.is_recoverable());
        assert!(VaultError::Storage("disk".to_string()).is_recoverable());
        assert!(!VaultError::Derivation("empty".to_string()).is_recoverable());
        assert!(!VaultError::NotFound.is_recoverable());
        assert!(!VaultError::Encryption("aead".to_string()).is_recoverable());
    }

    #[test]
    fn test_display_is_stable() {
        let err = VaultError::invalid_input("dob", "month out of range");
        assert_eq!(err.to_string(), "invalid_input_dob: month out of range");
        let err = VaultError::InvalidState {
            operation: "unlock",
            state: "NoIdentity".to_string(),
        };
        assert_eq!(err.to_string(), "invalid_state: cannot unlock while NoIdentity");
        let err = VaultError::Encryption("AES-GCM encryption failed".to_string());
        assert_eq!(err.to_string(), "encryption_error: AES-GCM encryption failed");
    }
}
