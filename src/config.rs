//! Store configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Backing file used when no path is configured.
pub const DEFAULT_FILE_PATH: &str = "database.json";

/// Configuration for opening a file-backed store.
///
/// `file_path` is the only recognized option. Relative paths resolve against
/// the directory of the running executable, not the working directory.
/// Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Path of the backing file.
    pub file_path: PathBuf,
}

impl StoreConfig {
    /// Create a config pointing at the given backing file.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Resolve the backing file location.
    pub fn resolve(&self) -> Result<PathBuf> {
        if self.file_path.is_absolute() {
            return Ok(self.file_path.clone());
        }
        Ok(base_dir()?.join(&self.file_path))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_PATH)
    }
}

/// Directory containing the running executable.
fn base_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
