//! Identity and scripts of a host command
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DispatchError;
use crate::journal_data::JournalData;

pub const RUNNER_COMMAND_NAME: &str = "PyRevitRunner";
pub const RUNNER_BUNDLE: &str = "pyRevitRunner";
pub const RUNNER_EXTENSION: &str = "pyRevitRunner";
pub const RUNNER_UNIQUE_ID: &str = "pyRevitRunner-PyRevitRunnerCommand";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub script: PathBuf,
    /// Script run instead of `script` when Shift is held
    pub alternate_script: PathBuf,
    /// `;`-joined interpreter search paths
    pub search_paths: String,
    pub name: String,
    pub bundle: String,
    pub extension: String,
    pub unique_id: String,
}

impl CommandSpec {
    /// The command the runner add-in exposes, fed from the journal's data block
    pub fn from_journal_data(data: &JournalData) -> Result<Self, DispatchError> {
        let script = data.script_source()?;
        Ok(Self {
            alternate_script: script.clone(),
            script,
            search_paths: data.search_paths()?.join(";"),
            name: RUNNER_COMMAND_NAME.to_string(),
            bundle: RUNNER_BUNDLE.to_string(),
            extension: RUNNER_EXTENSION.to_string(),
            unique_id: RUNNER_UNIQUE_ID.to_string(),
        })
    }
}
