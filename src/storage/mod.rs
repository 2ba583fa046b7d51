//! Key-value persistence for saved prompts
//!
//! History is written through a small get/set/remove interface so the store
//! can run against local files in the binary and an in-memory map in tests.

pub mod file;
pub mod mock;

pub use file::FileStorage;
pub use mock::MockStorage;

use crate::Result;

pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
