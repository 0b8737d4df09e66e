//! Engine configuration.
//!
//! Everything the engine would otherwise read from process-wide state lives
//! here and is passed to constructors explicitly.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_DATA_PATH, MAX_PATH_SIZE};
use crate::time_system::LatencyCompensation;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("data folder path has an invalid length: {0:?}")]
    InvalidDataFolder(String),
    #[error("data folder {0} does not exist or is unavailable")]
    MissingDataFolder(String),
}

/// Path of the data folder; always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFolder(String);

impl DataFolder {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let len = path.len();
        if len < 2 || len >= MAX_PATH_SIZE - 1 {
            return Err(ConfigError::InvalidDataFolder(path.to_string()));
        }
        if path.ends_with('/') {
            Ok(Self(path.to_string()))
        } else {
            Ok(Self(format!("{path}/")))
        }
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join(&self, file_name: &str) -> PathBuf {
        self.as_path().join(file_name)
    }

    /// Fail unless the folder exists and is a directory.
    pub fn ensure_exists(&self) -> Result<(), ConfigError> {
        if self.as_path().is_dir() {
            Ok(())
        } else {
            Err(ConfigError::MissingDataFolder(self.0.clone()))
        }
    }
}

impl Default for DataFolder {
    fn default() -> Self {
        Self(DEFAULT_DATA_PATH.to_string())
    }
}

impl fmt::Display for DataFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings for the online engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_folder: DataFolder,
    /// Consult the opening book before searching.
    pub use_opening_book: bool,
    pub latency: LatencyCompensation,
}

impl EngineConfig {
    pub fn new(data_folder: DataFolder) -> Self {
        Self {
            data_folder,
            use_opening_book: true,
            latency: LatencyCompensation::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DataFolder::default())
    }
}
