//! Persistent key-value storage backing the vault.

mod file;
mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
