//! Centralized home-based storage paths for all fridgechef persistence.
//!
//! Everything lives under `~/.fridgechef/`:
//! - `kv_store.json` - local key-value store (usage record, cached
//!   subscription status, device identifier, region override)
//!
//! The base directory can be overridden with the `FRIDGECHEF_HOME`
//! environment variable, or per-test via [`set_home_for_test`].

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;

/// The name of the fridgechef directory under the user's home.
const FRIDGECHEF_DIR: &str = ".fridgechef";

/// Process-wide home override used by tests.
static HOME_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Returns the fridgechef home directory, creating it if needed.
///
/// Resolution order: test override, `FRIDGECHEF_HOME`, `~/.fridgechef/`.
pub fn fridgechef_home_dir() -> Result<PathBuf> {
    let dir = if let Some(overridden) = HOME_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        overridden
    } else if let Ok(env_home) = std::env::var("FRIDGECHEF_HOME") {
        PathBuf::from(env_home)
    } else {
        let home =
            dirs::home_dir().context("Could not determine home directory for app storage")?;
        home.join(FRIDGECHEF_DIR)
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create fridgechef directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the key-value store file path: `<home>/kv_store.json`
pub fn kv_store_path() -> Result<PathBuf> {
    Ok(fridgechef_home_dir()?.join("kv_store.json"))
}

/// Guard returned by [`set_home_for_test`]; clears the override when dropped.
pub struct HomeGuard;

impl Drop for HomeGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = HOME_OVERRIDE.lock() {
            *guard = None;
        }
    }
}

/// Overrides the fridgechef home directory for the duration of a test.
///
/// Tests using this should run serially since the override is process-wide.
pub fn set_home_for_test(path: PathBuf) -> HomeGuard {
    if let Ok(mut guard) = HOME_OVERRIDE.lock() {
        *guard = Some(path);
    }
    HomeGuard
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_home_override_and_reset() {
        let temp_dir = TempDir::new().unwrap();
        {
            let _guard = set_home_for_test(temp_dir.path().to_path_buf());
            let home = fridgechef_home_dir().unwrap();
            assert_eq!(home, temp_dir.path());
        }
        // After the guard drops, the override no longer applies.
        let home = fridgechef_home_dir().unwrap();
        assert_ne!(home, temp_dir.path());
    }

    #[test]
    #[serial]
    fn test_kv_store_path_under_home() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = set_home_for_test(temp_dir.path().to_path_buf());

        let path = kv_store_path().unwrap();
        assert_eq!(path, temp_dir.path().join("kv_store.json"));
    }
}
