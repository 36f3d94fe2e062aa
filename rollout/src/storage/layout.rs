//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Default location of the rollout files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all files
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the environments configuration file path
    pub fn environments_file(&self) -> File {
        File::new(self.base_dir.join("environments.json"))
    }

    /// Get the resource tracker file path
    pub fn tracker_file(&self) -> File {
        File::new(self.base_dir.join("tracker.json"))
    }

    /// Get the audit log file path
    pub fn log_file(&self) -> PathBuf {
        self.base_dir.join("logs").join("rollout.log")
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(".rollout")
    }
}
