//! Script execution seam. The interpreter itself lives outside this crate.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// What to run and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub script: PathBuf,
    pub search_paths: String,
    pub command_name: String,
    pub command_unique_id: String,
    pub forced_debug: bool,
    pub alt_script_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// 0 means success; anything else is a failure of some kind
    pub code: i32,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ExecutionResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}

pub const ENV_SEARCH_PATHS: &str = "RUNNER_SEARCH_PATHS";
pub const ENV_DEBUG: &str = "RUNNER_DEBUG";
pub const ENV_ALT_SCRIPT: &str = "RUNNER_ALT_SCRIPT";
pub const ENV_COMMAND_NAME: &str = "RUNNER_COMMAND_NAME";
pub const ENV_COMMAND_ID: &str = "RUNNER_COMMAND_ID";

/// Runs the script with an external interpreter; the exit code is the result code
#[derive(Debug, Clone)]
pub struct ProcessScriptExecutor {
    interpreter: String,
}

impl ProcessScriptExecutor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl ScriptExecutor for ProcessScriptExecutor {
    fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        debug!(
            script = %request.script.display(),
            interpreter = %self.interpreter,
            "executing script"
        );
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&request.script)
            .env(ENV_SEARCH_PATHS, &request.search_paths)
            .env(ENV_COMMAND_NAME, &request.command_name)
            .env(ENV_COMMAND_ID, &request.command_unique_id)
            .stdin(Stdio::null());
        if request.forced_debug {
            command.env(ENV_DEBUG, "1");
        }
        if request.alt_script_mode {
            command.env(ENV_ALT_SCRIPT, "1");
        }

        let result = match command.status() {
            Ok(status) => match status.code() {
                Some(code) => ExecutionResult::from_code(code),
                None => ExecutionResult::from_code(-1)
                    .with("error", "interpreter terminated by signal"),
            },
            Err(e) => {
                warn!(interpreter = %self.interpreter, error = %e, "failed to start interpreter");
                ExecutionResult::from_code(-1).with("error", e.to_string())
            }
        };
        result.with("interpreter", self.interpreter.clone())
    }
}
