use rabbithole_config::StorageSettings;
use rabbithole_core::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{check_quota, KeyValueStore};

const SLOT_EXTENSION: &str = "slot";

/// File-backed slots: one file per key under `base_dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        debug!("FileStore initialized: base_dir={:?}", base_dir);
        Self {
            base_dir,
            quota: None,
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        let mut store = Self::new(&settings.dir);
        store.quota = settings.quota_bytes;
        store
    }

    /// Limit the combined size of all slots, in bytes.
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a key onto a filesystem-safe file name.
    fn slot_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{safe_key}.{SLOT_EXTENSION}"))
    }

    fn ensure_base_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }

    /// Bytes held by every slot except `exclude`.
    fn used_bytes_excluding(&self, exclude: &Path) -> Result<usize> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0usize;
        for entry in entries {
            let path = entry?.path();
            if path == exclude || path.extension().and_then(|e| e.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            total += fs::metadata(&path)?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key);
        if self.quota.is_some() {
            let used = self.used_bytes_excluding(&path)?;
            check_quota(key, used + value.len(), self.quota)?;
        }

        self.ensure_base_dir()?;
        // Write beside the slot and rename so readers never see half a value.
        let tmp = path.with_extension(format!("{SLOT_EXTENSION}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!("Stored {} bytes in slot '{}'", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => {
                info!("Removed slot '{}'", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
