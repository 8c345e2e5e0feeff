//! Key derivation and authenticated encryption primitives.

pub mod cipher;
mod kdf;
mod key;

pub use kdf::{
    derive_key, derive_key_from_signature, derive_key_from_wallet_signature, derive_key_with,
    wallet_key_material, KdfParams, DEFAULT_KDF_INFO, DEFAULT_KDF_SALT,
};
pub use key::{SymmetricKey, KEY_SIZE};
