//! Reading the runner's invocation data back out of a journal.
//!
//! The host hands the invoked command the key/value pairs of the journal's
//! `APIStringStringMapJournalData` block. Outside the host the same pairs can
//! be recovered from the journal text itself.

use runner_core::journal::{
    DATA_BLOCK_NAME, KEY_LOG_FILE, KEY_MODELS, KEY_SCRIPT_SOURCE, KEY_SEARCH_PATHS, LIST_SEPARATOR,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DispatchError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalData {
    entries: BTreeMap<String, String>,
}

impl JournalData {
    pub fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Extract the data block from journal text
    pub fn parse(journal: &str) -> Result<Self, DispatchError> {
        let mut lines = journal.lines().skip_while(|l| !is_block_header(l));
        if lines.next().is_none() {
            return Err(DispatchError::MissingDataBlock(DATA_BLOCK_NAME));
        }

        let mut entries = BTreeMap::new();
        for line in lines {
            let line = line.trim();
            let Some(rest) = line.strip_prefix(',') else { break };
            let rest = rest.trim_end_matches('_').trim_end();
            // odd segments between quotes are the quoted tokens
            let tokens: Vec<&str> = rest.split('"').skip(1).step_by(2).collect();
            if let [key, value] = tokens[..] {
                entries.insert(key.to_string(), value.to_string());
            }
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        let text = std::fs::read_to_string(path).map_err(|source| DispatchError::JournalRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> Result<&str, DispatchError> {
        self.get(key).ok_or(DispatchError::MissingJournalKey(key))
    }

    pub fn script_source(&self) -> Result<PathBuf, DispatchError> {
        self.require(KEY_SCRIPT_SOURCE).map(PathBuf::from)
    }

    pub fn search_paths(&self) -> Result<Vec<String>, DispatchError> {
        self.require(KEY_SEARCH_PATHS).map(split_list)
    }

    pub fn models(&self) -> Result<Vec<PathBuf>, DispatchError> {
        Ok(split_list(self.require(KEY_MODELS)?).into_iter().map(PathBuf::from).collect())
    }

    pub fn log_file(&self) -> Result<PathBuf, DispatchError> {
        self.require(KEY_LOG_FILE).map(PathBuf::from)
    }

    /// Execution id encoded in the log file name, if the name has the runner's shape
    pub fn execution_id(&self) -> Option<String> {
        let log_file = self.log_file().ok()?;
        let name = log_file.file_name()?.to_str()?;
        let id = name.strip_prefix("PyRevitRunner_")?.strip_suffix(".log")?;
        (runner_core::log_file_name(id) == name).then(|| id.to_string())
    }
}

fn is_block_header(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("Jrn.Data") && line.contains(&format!("\"{}\"", DATA_BLOCK_NAME))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
