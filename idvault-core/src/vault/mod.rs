//! Encrypted vault store: one identity record, one storage key.

mod blob;
mod store;

pub use blob::VaultBlob;
pub use store::{LoadedIdentity, Vault, DEFAULT_STORAGE_KEY};
