//! Runner configuration loaded from YAML.
//!
//! ```yaml
//! target:
//!   product:
//!     name: Autodesk Revit 2019
//!     product_year: 2019
//!     launch_path: "C:/Program Files/Autodesk/Revit 2019/Revit.exe"
//!   clone: { name: master, path: "C:/pyRevit/master" }
//!   engine: { version: 277, path: "C:/pyRevit/master/bin/engines/277" }
//! purge_after_run: true
//! timeout_secs: 600
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environment::EnvironmentSettings;
use crate::error::RunnerError;
use crate::manifest::DEFAULT_VENDOR_ID;
use crate::runner::RunOptions;
use crate::target::TargetBinding;

/// Overrides `temp_root` when set
pub const TEMP_ROOT_ENV: &str = "RUNNER_TEMP_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub target: TargetBinding,
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
    #[serde(default)]
    pub purge_after_run: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
}

fn default_vendor_id() -> String {
    DEFAULT_VENDOR_ID.to_string()
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RunnerError> {
        serde_yaml::from_str(yaml).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Environment settings, honoring the temp root env override
    pub fn environment_settings(&self) -> EnvironmentSettings {
        let temp_root = std::env::var_os(TEMP_ROOT_ENV)
            .map(PathBuf::from)
            .or_else(|| self.temp_root.clone())
            .unwrap_or_else(std::env::temp_dir);
        EnvironmentSettings {
            temp_root,
            vendor_id: self.vendor_id.clone(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            purge_after_run: self.purge_after_run,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}
