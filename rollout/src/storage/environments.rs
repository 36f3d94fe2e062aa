//! Environment configuration source

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RolloutError;
use crate::filesys::file::File;
use crate::models::environment::EnvironmentConfig;

/// Answers which nodes an environment is made of
pub trait ConfigurationManager: Send + Sync {
    fn get_environment_config(&self, name: &str) -> Result<EnvironmentConfig, RolloutError>;

    /// Name of the environment new nodes of `name` are seeded from
    fn get_seed_environment_name(&self, name: &str) -> Result<Option<String>, RolloutError> {
        Ok(self.get_environment_config(name)?.seed_environment)
    }
}

/// Contents of the environments file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentsFile {
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// Configuration read from a JSON environments file
#[derive(Debug, Clone, Default)]
pub struct FileConfigurationManager {
    contents: EnvironmentsFile,
}

impl FileConfigurationManager {
    pub fn new(contents: EnvironmentsFile) -> Self {
        Self { contents }
    }

    pub async fn load(file: &File) -> Result<Self, RolloutError> {
        let contents: EnvironmentsFile = file.read_json().await?;
        debug!(
            "Loaded {} environment(s) from {}",
            contents.environments.len(),
            file.path().display()
        );
        Ok(Self::new(contents))
    }
}

impl ConfigurationManager for FileConfigurationManager {
    fn get_environment_config(&self, name: &str) -> Result<EnvironmentConfig, RolloutError> {
        self.contents
            .environments
            .get(name)
            .cloned()
            .ok_or_else(|| RolloutError::ConfigError(format!("Unknown environment: {}", name)))
    }
}
