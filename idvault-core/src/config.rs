//! Vault configuration and per-environment defaults.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::crypto::{KdfParams, DEFAULT_KDF_INFO, DEFAULT_KDF_SALT};
use crate::registry::DEVELOPMENT_CHAIN_ID;
use crate::signer::DEFAULT_SIGNING_MESSAGE;
use crate::vault::DEFAULT_STORAGE_KEY;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Local development node.
    Development,
    /// Public deployment.
    Production,
}

/// Settings for the vault and its collaborators.
///
/// Changing `signing_message` or the KDF labels changes the derived key and
/// locks out existing vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VaultConfig {
    /// Storage key of the vault blob.
    pub storage_key: String,
    /// Message the wallet signs to derive the vault key.
    pub signing_message: String,
    /// HKDF salt.
    pub kdf_salt: String,
    /// HKDF info label.
    pub kdf_info: String,
    /// Chain id the registry must be on. Registry reads are refused when unset.
    pub expected_chain_id: Option<u64>,
    /// Address of the verification registry contract.
    pub registry_address: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::from_environment(Environment::Development)
    }
}

impl VaultConfig {
    /// Returns the defaults for `environment`.
    ///
    /// Production has no default chain id; it must be configured explicitly.
    #[must_use]
    pub fn from_environment(environment: Environment) -> Self {
        let expected_chain_id = match environment {
            Environment::Development => Some(DEVELOPMENT_CHAIN_ID),
            Environment::Production => None,
        };
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            signing_message: DEFAULT_SIGNING_MESSAGE.to_string(),
            kdf_salt: String::from_utf8_lossy(DEFAULT_KDF_SALT).into_owned(),
            kdf_info: String::from_utf8_lossy(DEFAULT_KDF_INFO).into_owned(),
            expected_chain_id,
            registry_address: None,
        }
    }

    /// HKDF parameters for key derivation.
    #[must_use]
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            salt: self.kdf_salt.as_bytes().to_vec(),
            info: self.kdf_info.as_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str("production").unwrap(),
            Environment::Production
        );
        assert_eq!(Environment::Development.to_string(), "development");
        assert!(Environment::from_str("staging").is_err());
    }

    #[test]
    fn test_defaults_match_crypto_labels() {
        let config = VaultConfig::default();
        assert_eq!(config.kdf_params(), KdfParams::default());
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.expected_chain_id, Some(DEVELOPMENT_CHAIN_ID));
    }

    #[test]
    fn test_production_requires_chain_id() {
        let config = VaultConfig::from_environment(Environment::Production);
        assert_eq!(config.expected_chain_id, None);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"expectedChainId": 11155111}"#).unwrap();
        assert_eq!(config.expected_chain_id, Some(11_155_111));
        assert_eq!(config.signing_message, DEFAULT_SIGNING_MESSAGE);
    }
}
