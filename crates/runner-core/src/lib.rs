//! Runner Core: isolated execution environments and playback runs
//!
//! One run = one uniquely named working directory holding a generated journal
//! and an add-in manifest, one host process replaying that journal, and an
//! optional purge of the directory afterwards.

pub mod config;
pub mod environment;
pub mod error;
pub mod journal;
pub mod manifest;
pub mod runner;
pub mod target;

pub use config::RunnerConfig;
pub use environment::{log_file_name, EnvironmentSettings, ExecutionEnvironment};
pub use error::RunnerError;
pub use journal::{render_journal, JournalFields};
pub use manifest::ManifestRecord;
pub use runner::{run, Orchestrator, RunOptions};
pub use target::{ExtensionClone, HostProduct, LoaderEngine, TargetBinding};
