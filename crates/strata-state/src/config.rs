//! Store configuration

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Default file name of the committed tree inside the store directory.
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// Configuration for a filesystem-backed node store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the store file
    pub root: PathBuf,
    /// File name of the committed tree (default: "store.json")
    pub file_name: String,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_name: DEFAULT_STORE_FILE.to_string(),
        }
    }

    /// Set custom store file name
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Full path of the store file.
    pub fn store_path(&self) -> PathBuf {
        self.root.join(&self.file_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - STRATA_HOME (required)
    /// - STRATA_STORE_FILE (optional, default: "store.json")
    pub fn from_env() -> Result<Self, StorageError> {
        let root = std::env::var("STRATA_HOME")
            .map_err(|_| StorageError::Config("STRATA_HOME not set".to_string()))?;
        let file_name = std::env::var("STRATA_STORE_FILE")
            .unwrap_or_else(|_| DEFAULT_STORE_FILE.to_string());

        if file_name.is_empty() || file_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(StorageError::Config(format!(
                "STRATA_STORE_FILE must be a plain file name, got '{}'",
                file_name
            )));
        }

        Ok(Self {
            root: PathBuf::from(root),
            file_name,
        })
    }
}
