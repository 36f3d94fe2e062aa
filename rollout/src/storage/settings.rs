//! Settings file management

use serde::{Deserialize, Serialize};

use crate::deploy::fsm::ConvergenceSettings;
use crate::logs::LogLevel;

/// Rollout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Also write logs to the layout's log file
    #[serde(default = "default_true")]
    pub log_to_file: bool,

    /// Whether an operator is attached to answer prompts
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Convergence loop tuning
    #[serde(default)]
    pub convergence: ConvergenceSettings,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_to_file: true,
            interactive: true,
            convergence: ConvergenceSettings::default(),
        }
    }
}
