//! Durable key-value storage for client-side session state.
//!
//! The session never touches the filesystem directly; it goes through a
//! `KeyValueStore`. `FileStore` persists to a JSON file in the cache
//! directory so a token survives restarts, `MemoryStore` keeps everything
//! in process.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// String-keyed, string-valued storage that outlives a single request.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove several keys in one write where the backend supports it.
    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}
