use rabbithole_core::{RabbitHoleError, Result};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::{check_quota, KeyValueStore};

/// In-process slots. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the combined size of all slots, in bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RabbitHoleError {
    RabbitHoleError::StorageError("memory store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        let others: usize = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(key, others + value.len(), self.quota)?;

        slots.insert(key.to_string(), value.to_string());
        debug!("Stored {} bytes in memory slot '{}'", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        slots.remove(key);
        Ok(())
    }
}
