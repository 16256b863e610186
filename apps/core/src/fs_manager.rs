use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Name of the file backing the extension's local key/value storage.
const STORAGE_FILENAME: &str = "storage.json";

pub struct PortablePathManager;

impl PortablePathManager {
    /// Directory of the running executable, or the working directory when it cannot be resolved.
    pub fn root_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                error!(
                    "Failed to get current exe path: {}. Falling back to current_dir.",
                    e
                );
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }

    /// Default data directory (`<root>/data`).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// Location of the persisted settings inside `data_dir`.
    pub fn storage_file(data_dir: &Path) -> PathBuf {
        data_dir.join(STORAGE_FILENAME)
    }

    /// Creates the data directory if it does not exist.
    pub fn init(data_dir: &Path) -> Result<(), io::Error> {
        if !data_dir.exists() {
            info!("Creating data directory: {:?}", data_dir);
            fs::create_dir_all(data_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_nested_data_dir() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("a").join("data");
        PortablePathManager::init(&data).unwrap();
        assert!(data.is_dir());
        assert_eq!(PortablePathManager::storage_file(&data), data.join("storage.json"));
    }
}
