//! Durable credential storage
//!
//! A small keyed JSON store standing in for the dashboard's client-side
//! storage. Holds the partner config, the partner token and the dashboard
//! API credentials under fixed string keys.

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Fixed storage keys
pub mod keys {
    pub const PARTNER_CONFIG: &str = "ragline.partner.config";
    pub const PARTNER_TOKEN: &str = "ragline.partner.token";
    pub const DASHBOARD_CREDENTIALS: &str = "ragline.dashboard.credentials";
}

/// Keyed JSON storage seam; object-safe so stores and the token manager can
/// share one `Arc<dyn CredentialStorage>` and tests can swap in memory.
pub trait CredentialStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read a typed value from storage
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn CredentialStorage,
    key: &str,
) -> Result<Option<T>> {
    match storage.get(key)? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::classify(format!("corrupt entry {key}: {e}"))),
    }
}

/// Write a typed value to storage
pub fn store_json<T: Serialize>(
    storage: &dyn CredentialStorage,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value).map_err(AppError::classify)?;
    storage.set(key, value)
}

// A poisoned lock means a writer panicked mid-update; surface it as an error
// instead of panicking the caller too
fn poisoned() -> AppError {
    AppError::classify("credential store lock poisoned")
}

/// File-backed storage under the ragline home directory
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles across threads
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Get the ragline home directory (`~/.ragline`, overridable via
    /// `RAGLINE_HOME`)
    pub fn ragline_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("RAGLINE_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::classify("could not find home directory"))?;
        Ok(home.join(".ragline"))
    }

    /// Default store at `<ragline home>/credentials.json`
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Self::ragline_home()?.join("credentials.json")))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::classify(format!("failed to read {:?}: {e}", self.path)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::classify(format!("failed to parse {:?}: {e}", self.path)))
    }

    fn write_all(&self, entries: &HashMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::classify(format!("failed to create directory {parent:?}: {e}"))
            })?;
        }
        let content = serde_json::to_string_pretty(entries).map_err(AppError::classify)?;
        std::fs::write(&self.path, content)
            .map_err(|e| AppError::classify(format!("failed to write {:?}: {e}", self.path)))?;
        tracing::debug!(path = ?self.path, "credential store written");

        // Credentials live here; restrict to owner on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)
                .map_err(AppError::classify)?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(AppError::classify)?;
        }

        Ok(())
    }
}

impl CredentialStorage for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}
