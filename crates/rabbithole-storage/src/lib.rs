//! Durable key-value slots.
//!
//! The conversation store keeps its whole collection in one slot and the
//! site theme in another. [`FileStore`] persists slots as files, while
//! [`MemoryStore`] keeps them for the lifetime of the process.

use rabbithole_core::Result;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Slot holding the JSON array of conversation records.
pub const CONVERSATIONS_KEY: &str = "rabbithole_conversations";

/// Slot holding `"light"` or `"dark"`.
pub const THEME_KEY: &str = "theme";

/// Synchronous string slots, in the spirit of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub(crate) fn check_quota(key: &str, size: usize, quota: Option<usize>) -> Result<()> {
    match quota {
        Some(limit) if size > limit => Err(rabbithole_core::RabbitHoleError::QuotaExceeded {
            key: key.to_string(),
            size,
            limit,
        }),
        _ => Ok(()),
    }
}
