//! Unified Error Model
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("CLONE/incompatible: runner component not found at {runner}; update the clone")]
    CloneIncompatible { runner: PathBuf },

    #[error("FS/mkdir {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FS/write {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("LAUNCH/{executable}: {source}")]
    HostProcessLaunchFailed {
        executable: PathBuf,
        working_directory: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HOST/wait in {working_directory}: {source}")]
    HostProcessWaitFailed {
        working_directory: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HOST/timeout after {timeout:?} in {working_directory}")]
    HostProcessTimedOut {
        working_directory: PathBuf,
        timeout: Duration,
    },

    #[error("CLEANUP/{path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RUNTIME/{0}")]
    Runtime(#[source] std::io::Error),

    #[error("TEMPLATE/{0}")]
    Template(String),

    #[error("CONFIG/{0}")]
    Config(String),
}

impl RunnerError {
    /// Cleanup failures are reported but never fail a run that already completed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RunnerError::CleanupFailed { .. })
    }
}
