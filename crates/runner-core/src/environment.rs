//! Execution Environment: the isolated workspace backing exactly one run.
//!
//! Every artifact of a run lives under `<temp root>/<execution id>`, so a
//! single recursive delete reclaims it and concurrent runs never share a path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RunnerError;
use crate::journal::{render_journal, JournalFields};
use crate::manifest::{ManifestRecord, DEFAULT_VENDOR_ID};
use crate::target::TargetBinding;

pub fn journal_file_name(execution_id: &str) -> String {
    format!("PyRevitRunner_{}.txt", execution_id)
}

/// Log file name; the runner command computes the same name on the host side
pub fn log_file_name(execution_id: &str) -> String {
    format!("PyRevitRunner_{}.log", execution_id)
}

/// Where environments are created and who they are registered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    pub temp_root: PathBuf,
    pub vendor_id: String,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            vendor_id: DEFAULT_VENDOR_ID.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionEnvironment {
    execution_id: String,
    working_directory: PathBuf,
    script: PathBuf,
    model_paths: Vec<PathBuf>,
    target: TargetBinding,
    purged: bool,
    exit_code: Option<i32>,
}

impl ExecutionEnvironment {
    /// Create an environment under the system temp directory
    pub fn new(
        target: TargetBinding,
        script: impl Into<PathBuf>,
        model_paths: Vec<PathBuf>,
    ) -> Result<Self, RunnerError> {
        Self::with_settings(&EnvironmentSettings::default(), target, script, model_paths)
    }

    /// Create an environment: check the clone, allocate the directory, write
    /// the journal and the manifest. Nothing is left on disk on failure.
    pub fn with_settings(
        settings: &EnvironmentSettings,
        target: TargetBinding,
        script: impl Into<PathBuf>,
        model_paths: Vec<PathBuf>,
    ) -> Result<Self, RunnerError> {
        let runner = target.runner_component();
        if !runner.is_file() {
            return Err(RunnerError::CloneIncompatible { runner });
        }
        Self::create(
            settings,
            Uuid::new_v4().to_string(),
            target,
            script.into(),
            model_paths,
        )
    }

    fn create(
        settings: &EnvironmentSettings,
        execution_id: String,
        target: TargetBinding,
        script: PathBuf,
        model_paths: Vec<PathBuf>,
    ) -> Result<Self, RunnerError> {
        let working_directory = settings.temp_root.join(&execution_id);
        fs::create_dir_all(&working_directory).map_err(|source| {
            RunnerError::DirectoryCreationFailed {
                path: working_directory.clone(),
                source,
            }
        })?;

        let env = Self {
            execution_id,
            working_directory,
            script,
            model_paths,
            target,
            purged: false,
            exit_code: None,
        };

        if let Err(e) = env.generate(&settings.vendor_id) {
            if let Err(cleanup) = fs::remove_dir_all(&env.working_directory) {
                warn!(
                    working_directory = %env.working_directory.display(),
                    error = %cleanup,
                    "failed to remove partially created environment"
                );
            }
            return Err(e);
        }

        debug!(
            execution_id = %env.execution_id,
            working_directory = %env.working_directory.display(),
            "execution environment created"
        );
        Ok(env)
    }

    fn generate(&self, vendor_id: &str) -> Result<(), RunnerError> {
        self.generate_journal()?;
        self.generate_manifest(vendor_id)
    }

    fn generate_journal(&self) -> Result<(), RunnerError> {
        let fields = JournalFields::new(&self.script, &self.model_paths, &self.log_file());
        let text = render_journal(&fields)?;
        let path = self.journal_file();
        fs::write(&path, text).map_err(|source| RunnerError::FileWriteFailed { path, source })
    }

    fn generate_manifest(&self, vendor_id: &str) -> Result<(), RunnerError> {
        ManifestRecord::runner(
            self.target.product.product_year,
            &self.target.runner_component(),
            vendor_id,
            &self.working_directory,
        )
        .write()
        .map(|_| ())
    }

    /// Delete the working directory. Deleting an absent directory succeeds.
    pub fn purge(&mut self) -> Result<(), RunnerError> {
        match fs::remove_dir_all(&self.working_directory) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(RunnerError::CleanupFailed {
                    path: self.working_directory.clone(),
                    source,
                })
            }
        }
        self.purged = true;
        debug!(execution_id = %self.execution_id, "execution environment purged");
        Ok(())
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn journal_file(&self) -> PathBuf {
        self.working_directory.join(journal_file_name(&self.execution_id))
    }

    pub fn log_file(&self) -> PathBuf {
        self.working_directory.join(log_file_name(&self.execution_id))
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.working_directory.join(crate::manifest::MANIFEST_FILE_NAME)
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn model_paths(&self) -> &[PathBuf] {
        &self.model_paths
    }

    pub fn target(&self) -> &TargetBinding {
        &self.target
    }

    pub fn is_purged(&self) -> bool {
        self.purged
    }

    /// Host exit code, once the run completed. `None` if it was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub(crate) fn record_exit(&mut self, code: Option<i32>) {
        self.exit_code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{ExtensionClone, HostProduct, LoaderEngine, RUNNER_COMPONENT};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _clone: TempDir,
        temp_root: TempDir,
        target: TargetBinding,
    }

    impl Fixture {
        fn new(with_runner: bool) -> Self {
            let clone = tempfile::tempdir().unwrap();
            let engine = clone.path().join("bin").join("engines").join("277");
            fs::create_dir_all(&engine).unwrap();
            if with_runner {
                fs::write(engine.join(RUNNER_COMPONENT), b"").unwrap();
            }
            let target = TargetBinding::new(
                HostProduct {
                    name: "Autodesk Revit 2019".to_string(),
                    product_year: 2019,
                    launch_path: PathBuf::from("Revit.exe"),
                },
                ExtensionClone {
                    name: "master".to_string(),
                    path: clone.path().to_path_buf(),
                },
                LoaderEngine { version: 277, path: engine },
            );
            Self {
                _clone: clone,
                temp_root: tempfile::tempdir().unwrap(),
                target,
            }
        }

        fn settings(&self) -> EnvironmentSettings {
            EnvironmentSettings {
                temp_root: self.temp_root.path().to_path_buf(),
                vendor_id: DEFAULT_VENDOR_ID.to_string(),
            }
        }

        fn entries(&self) -> usize {
            fs::read_dir(self.temp_root.path()).unwrap().count()
        }

        fn build(&self) -> Result<ExecutionEnvironment, RunnerError> {
            ExecutionEnvironment::with_settings(
                &self.settings(),
                self.target.clone(),
                "script.py",
                vec![],
            )
        }

        /// Build with a fixed id after occupying `blocked` (a file name inside
        /// the working directory) with a directory, so writing it fails.
        fn build_blocking(&self, blocked: &str) -> Result<ExecutionEnvironment, RunnerError> {
            let id = "0b5ad8f2-7c1e-4b7a-9f43-2d9e6a1c0f11".to_string();
            fs::create_dir_all(self.temp_root.path().join(&id).join(blocked)).unwrap();
            ExecutionEnvironment::create(
                &self.settings(),
                id,
                self.target.clone(),
                PathBuf::from("script.py"),
                vec![],
            )
        }
    }

    #[test]
    fn construction_writes_journal_and_manifest() {
        let fx = Fixture::new(true);
        let models = vec![PathBuf::from("C:/m1.rvt"), PathBuf::from("C:/m2.rvt")];
        let env = ExecutionEnvironment::with_settings(
            &fx.settings(),
            fx.target.clone(),
            "C:/scripts/test.py",
            models,
        )
        .unwrap();

        assert_eq!(env.working_directory(), fx.temp_root.path().join(env.execution_id()));
        assert!(!env.is_purged());

        let journal = fs::read_to_string(env.journal_file()).unwrap();
        assert!(journal.contains(r#""ScriptSource" , "C:/scripts/test.py""#));
        assert!(journal.contains(r#""Models" , "C:/m1.rvt;C:/m2.rvt""#));
        assert!(journal.contains(&env.log_file().display().to_string()));

        let manifest = fs::read_to_string(env.manifest_file()).unwrap();
        assert!(manifest.contains(&fx.target.runner_component().display().to_string()));
        assert!(env.log_file().ends_with(format!("PyRevitRunner_{}.log", env.execution_id())));
    }

    #[test]
    fn incompatible_clone_creates_nothing() {
        let fx = Fixture::new(false);
        let err = fx.build().unwrap_err();
        assert!(matches!(err, RunnerError::CloneIncompatible { .. }));
        assert_eq!(fx.entries(), 0);
    }

    #[test]
    fn failed_journal_write_removes_working_directory() {
        let fx = Fixture::new(true);
        let journal = journal_file_name("0b5ad8f2-7c1e-4b7a-9f43-2d9e6a1c0f11");
        let err = fx.build_blocking(&journal).unwrap_err();
        match err {
            RunnerError::FileWriteFailed { path, .. } => assert!(path.ends_with(&journal)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.entries(), 0);
    }

    #[test]
    fn failed_manifest_write_removes_journal_and_directory() {
        let fx = Fixture::new(true);
        let err = fx
            .build_blocking(crate::manifest::MANIFEST_FILE_NAME)
            .unwrap_err();
        assert!(matches!(err, RunnerError::FileWriteFailed { .. }));
        assert_eq!(fx.entries(), 0);
    }

    #[test]
    fn purge_is_idempotent() {
        let fx = Fixture::new(true);
        let mut env = fx.build().unwrap();
        env.purge().unwrap();
        assert!(env.is_purged());
        assert!(!env.working_directory().exists());
        env.purge().unwrap();
        assert!(!env.working_directory().exists());
    }

    #[test]
    fn concurrent_constructions_never_collide() {
        let fx = Arc::new(Fixture::new(true));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let fx = Arc::clone(&fx);
                std::thread::spawn(move || {
                    let env = fx.build().unwrap();
                    (
                        env.execution_id().to_string(),
                        env.working_directory().to_path_buf(),
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: HashSet<_> = results.iter().map(|(id, _)| id.clone()).collect();
        let dirs: HashSet<_> = results.iter().map(|(_, dir)| dir.clone()).collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(dirs.len(), 16);
        assert_eq!(fx.entries(), 16);
    }
}
