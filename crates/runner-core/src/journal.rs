//! Journal generation: the control script the host replays to drive one run.
//!
//! The journal activates the add-ins tab, invokes the runner command, hands it
//! a key/value data block and then quits the host, answering "No" to the save
//! prompt so no document change of a batch run is ever persisted.

use chrono::Local;
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RunnerError;

/// Timestamp format of the journal header (ex: "27-Oct-2016 19:33:31.459")
pub const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S%.3f";

/// Name of the data block the runner command reads at invocation time
pub const DATA_BLOCK_NAME: &str = "APIStringStringMapJournalData";

pub const KEY_SCRIPT_SOURCE: &str = "ScriptSource";
pub const KEY_SEARCH_PATHS: &str = "SearchPaths";
pub const KEY_MODELS: &str = "Models";
pub const KEY_LOG_FILE: &str = "LogFile";

/// Separator used for the model list and the search path list
pub const LIST_SEPARATOR: char = ';';

const JOURNAL_TEMPLATE_NAME: &str = "journal";

const JOURNAL_TEMPLATE: &str = r#"' pyrevitrunner generated journal
' 0:< 'C {{timestamp}};
Dim Jrn
Set Jrn = CrsJournalScript
Jrn.Directive "DebugMode", "PerformAutomaticActionInErrorDialog", 1
Jrn.Directive "DebugMode", "PermissiveJournal", 1
Jrn.RibbonEvent "TabActivated:Add-Ins"
Jrn.RibbonEvent "Execute external command:CustomCtrl_%CustomCtrl_%Add-Ins%pyRevitRunner%PyRevitRunnerCommand:PyRevitRunner.PyRevitRunnerCommand"
Jrn.Data "APIStringStringMapJournalData"  _
    , 4 _
    , "ScriptSource" , "{{script_source}}" _
    , "SearchPaths" , "{{search_paths}}" _
    , "Models" , "{{models}}" _
    , "LogFile" , "{{log_file}}"
Jrn.Command "SystemMenu" , "Quit the application; prompts to save projects , ID_APP_EXIT"
Jrn.Data "TaskDialogResult" , "Do you want to save changes to Untitled?", "No", "IDNO"
"#;

static JOURNAL_REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    // journal strings are taken verbatim by the host
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    let _ = handlebars.register_template_string(JOURNAL_TEMPLATE_NAME, JOURNAL_TEMPLATE);
    handlebars
});

/// The five values substituted into the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFields {
    pub timestamp: String,
    pub script_source: String,
    /// Extra interpreter search paths, `;`-joined. Currently always empty.
    pub search_paths: String,
    /// Documents to open before running, `;`-joined
    pub models: String,
    pub log_file: String,
}

impl JournalFields {
    /// Fields for a run starting now
    pub fn new(script: &Path, models: &[PathBuf], log_file: &Path) -> Self {
        Self::at(timestamp_now(), script, models, log_file)
    }

    pub fn at(
        timestamp: impl Into<String>,
        script: &Path,
        models: &[PathBuf],
        log_file: &Path,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            script_source: script.display().to_string(),
            search_paths: String::new(),
            models: join_paths(models),
            log_file: log_file.display().to_string(),
        }
    }
}

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// Render the journal text for the given fields
pub fn render_journal(fields: &JournalFields) -> Result<String, RunnerError> {
    JOURNAL_REGISTRY
        .render(JOURNAL_TEMPLATE_NAME, fields)
        .map_err(|e| RunnerError::Template(e.to_string()))
}
