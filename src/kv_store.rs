//! Local persistent key-value storage.
//!
//! The device exclusively owns this store. It holds the usage record, the
//! cached subscription status, the device identifier, and the manual region
//! override. Implementations use interior mutability so a single store can
//! be shared as `Arc<dyn KvStore>` between the quota tracker and the
//! entitlement resolver for the lifetime of an app session.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key for the persisted usage record (JSON-encoded [`crate::quota::UsageRecord`]).
pub const USAGE_RECORD_KEY: &str = "usage_record";
/// Key for the locally cached subscription status.
pub const SUBSCRIPTION_STATUS_KEY: &str = "subscription_status";
/// Key for the opaque device identifier.
pub const DEVICE_ID_KEY: &str = "device_id";
/// Key for the manual region/pricing override.
pub const REGION_OVERRIDE_KEY: &str = "region_override";

/// String key-value storage with persistence semantics left to the impl.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: a single pretty-printed JSON object at
/// `~/.fridgechef/kv_store.json`, rewritten on every mutation.
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileKvStore {
    /// Opens the store at the default location, loading existing entries.
    pub fn open() -> Result<Self> {
        let path = crate::storage_paths::kv_store_path()?;
        Self::open_at(path)
    }

    /// Opens the store at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let content =
                std::fs::read_to_string(&path).context("Failed to read key-value store")?;
            serde_json::from_str(&content).context("Failed to parse key-value store")?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let content =
            serde_json::to_string_pretty(entries).context("Failed to serialize key-value store")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write key-value store: {}", self.path.display()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Key-value store lock poisoned"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Key-value store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Key-value store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Key-value store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
