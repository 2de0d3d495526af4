//! Host-side settings, loaded from YAML
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DispatchError;
use crate::usage::{SharedUsageState, UsageLogSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default)]
    pub usage_logging: bool,
    #[serde(default)]
    pub usage_log_file: Option<PathBuf>,
    /// Records are also posted here when set
    #[serde(default)]
    pub usage_server_url: Option<String>,
    /// Interpreter used by the process-backed script executor
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_interpreter() -> String {
    "python".to_string()
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            usage_logging: false,
            usage_log_file: None,
            usage_server_url: None,
            interpreter: default_interpreter(),
        }
    }
}

impl DispatchSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Settings(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DispatchError> {
        serde_yaml::from_str(yaml).map_err(|e| DispatchError::Settings(e.to_string()))
    }

    pub fn usage_state(&self) -> SharedUsageState {
        SharedUsageState::new(UsageLogSnapshot {
            enabled: self.usage_logging,
            log_file: self.usage_log_file.clone(),
            server_url: self.usage_server_url.clone(),
        })
    }
}
