//! Persisted extension state.
//!
//! The only value shared across contexts is the `extensionEnabled` flag. The
//! popup writes it, content scripts and the background read it.

use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage key of the on/off flag.
pub const ENABLED_KEY: &str = "extensionEnabled";
const UPDATED_AT_KEY: &str = "updatedAt";

/// Value assumed when nothing has been persisted yet.
pub const DEFAULT_ENABLED: bool = true;

/// The runtime's local key/value storage, reduced to what the extension uses.
pub trait SettingsStore: Send + Sync + 'static {
    /// Returns the stored flag, or `None` if it was never written.
    fn load_enabled(&self) -> Result<Option<bool>, AppError>;

    fn save_enabled(&self, enabled: bool) -> Result<(), AppError>;
}

/// Volatile store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    enabled: Mutex<Option<bool>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled: Mutex::new(Some(enabled)),
        }
    }
}

#[cfg(test)]
impl SettingsStore for MemoryStore {
    fn load_enabled(&self) -> Result<Option<bool>, AppError> {
        let guard = self
            .enabled
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(*guard)
    }

    fn save_enabled(&self, enabled: bool) -> Result<(), AppError> {
        let mut guard = self
            .enabled
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        *guard = Some(enabled);
        Ok(())
    }
}

/// Store backed by a JSON object on disk; survives runtime restarts.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the standard location inside `data_dir`, creating the directory if needed.
    pub fn in_data_dir(data_dir: &Path) -> Result<Self, AppError> {
        PortablePathManager::init(data_dir)?;
        Ok(Self::new(PortablePathManager::storage_file(data_dir)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, AppError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Storage(format!(
                "{:?} does not contain a JSON object",
                self.path
            ))),
            Err(e) => Err(AppError::Storage(format!("Corrupt storage file {:?}: {}", self.path, e))),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load_enabled(&self) -> Result<Option<bool>, AppError> {
        let map = self.read_map()?;
        Ok(map.get(ENABLED_KEY).and_then(Value::as_bool))
    }

    fn save_enabled(&self, enabled: bool) -> Result<(), AppError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let mut map = self.read_map().unwrap_or_else(|e| {
            warn!("Discarding unreadable storage: {}", e);
            Map::new()
        });
        map.insert(ENABLED_KEY.to_string(), Value::Bool(enabled));
        map.insert(UPDATED_AT_KEY.to_string(), Value::String(Utc::now().to_rfc3339()));

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Persisted {}={} to {:?}", ENABLED_KEY, enabled, self.path);
        Ok(())
    }
}

/// Explicit access point for the process-wide `enabled` flag.
#[derive(Clone)]
pub struct ExtensionState {
    store: Arc<dyn SettingsStore>,
}

impl ExtensionState {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The persisted value, if any.
    ///
    /// Unreadable storage is logged and treated as absent; the next write repairs it.
    pub fn stored(&self) -> Option<bool> {
        match self.store.load_enabled() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {}: {}", ENABLED_KEY, e);
                None
            }
        }
    }

    /// The effective value: the persisted one, else the default.
    pub fn is_enabled(&self) -> bool {
        self.stored().unwrap_or(DEFAULT_ENABLED)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), AppError> {
        self.store.save_enabled(enabled)
    }
}
