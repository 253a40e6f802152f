//! Local pending-progress store. Progress accumulated before login sits here
//! keyed by the conventions in `names`, and is removed only after the server
//! confirms persistence.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use color_eyre::{eyre::eyre, Result};

#[cfg_attr(test, mockall::automock)]
pub trait ProgressOutbox: Send + Sync {
    fn keys(&self) -> Result<Vec<String>>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory outbox, used in tests and short-lived tools.
#[derive(Default)]
pub struct MemoryOutbox {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| eyre!("outbox lock poisoned"))
    }
}

impl ProgressOutbox for MemoryOutbox {
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// File-backed outbox: one file per key under a directory. Keys follow the
/// `names` conventions and contain no path separators.
pub struct FileOutbox {
    dir: PathBuf,
}

impl FileOutbox {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl ProgressOutbox for FileOutbox {
    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.dir.join(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        std::fs::write(self.dir.join(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        std::fs::remove_file(self.dir.join(key))?;
        Ok(())
    }
}
