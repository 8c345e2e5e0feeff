#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Local identity vault keyed by a wallet signature.
//!
//! A holder's identity record is sealed with AES-256-GCM under a key derived
//! (HKDF-SHA256) from their wallet's signature over a fixed message, and kept
//! as a single blob in a key-value store. The [`IdentityController`] drives
//! the create / unlock / logout / purge lifecycle; on-chain verification
//! state is only ever read, never written.

pub mod config;
pub use config::{Environment, VaultConfig};

mod controller;
pub use controller::{IdentityController, IdentityState};

pub mod crypto;

mod error;
pub use error::*;

pub mod identity;
pub use identity::{Commitment, IdentityRecord, Salt};

pub mod logger;

pub mod proof;

pub mod registry;

mod session;
pub use session::SessionKeyCache;

pub mod signer;
pub use signer::{SignerError, StaticSigner, WalletSigner};

pub mod storage;

pub mod vault;
