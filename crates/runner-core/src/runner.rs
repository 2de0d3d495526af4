//! Run Orchestrator: binds an environment to one host process lifetime
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::environment::{EnvironmentSettings, ExecutionEnvironment};
use crate::error::RunnerError;
use crate::target::TargetBinding;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub purge_after_run: bool,
    /// Kill the host if it has not exited in time. `None` waits forever.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    settings: EnvironmentSettings,
}

impl Orchestrator {
    pub fn new(settings: EnvironmentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    /// Run `script` against `model_paths` in a fresh environment and wait for
    /// the host to exit
    pub async fn run(
        &self,
        target: &TargetBinding,
        script: impl Into<PathBuf>,
        model_paths: Vec<PathBuf>,
        purge_after_run: bool,
    ) -> Result<ExecutionEnvironment, RunnerError> {
        let options = RunOptions {
            purge_after_run,
            timeout: None,
        };
        self.run_with_options(target, script, model_paths, &options).await
    }

    pub async fn run_with_options(
        &self,
        target: &TargetBinding,
        script: impl Into<PathBuf>,
        model_paths: Vec<PathBuf>,
        options: &RunOptions,
    ) -> Result<ExecutionEnvironment, RunnerError> {
        let script = script.into();
        debug!("Running script: \"{}\"", script.display());
        debug!("With: {}", target.product);
        debug!("Using: {}", target.clone);
        debug!("On Engine: {}", target.engine.version);

        let mut env = ExecutionEnvironment::with_settings(
            &self.settings,
            target.clone(),
            script,
            model_paths,
        )?;
        let journal = env.journal_file();

        let mut command = Command::new(target.launch_path());
        command
            .arg(&journal)
            .current_dir(env.working_directory())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        info!(
            execution_id = %env.execution_id(),
            journal = %journal.display(),
            "running host in playback mode"
        );
        let mut child = command.spawn().map_err(|source| {
            error!(
                executable = %target.launch_path().display(),
                error = %source,
                "failed to start host"
            );
            RunnerError::HostProcessLaunchFailed {
                executable: target.launch_path().to_path_buf(),
                working_directory: env.working_directory().to_path_buf(),
                source,
            }
        })?;

        let waited = match options.timeout {
            None => child.wait().await,
            Some(timeout) => {
                let waited = tokio::time::timeout(timeout, child.wait()).await;
                match waited {
                    Ok(status) => status,
                    Err(_) => {
                        warn!(
                            execution_id = %env.execution_id(),
                            ?timeout,
                            "host did not exit in time, killing it"
                        );
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "failed to kill host process");
                        }
                        // an interrupted environment is never reused
                        if options.purge_after_run {
                            purge_quietly(&mut env);
                        }
                        return Err(RunnerError::HostProcessTimedOut {
                            working_directory: env.working_directory().to_path_buf(),
                            timeout,
                        });
                    }
                }
            }
        };
        let status = waited.map_err(|source| RunnerError::HostProcessWaitFailed {
            working_directory: env.working_directory().to_path_buf(),
            source,
        })?;

        env.record_exit(status.code());
        info!(
            execution_id = %env.execution_id(),
            exit_code = ?status.code(),
            "host exited"
        );

        if options.purge_after_run {
            purge_quietly(&mut env);
        }

        Ok(env)
    }

    /// Synchronous form of [`Orchestrator::run_with_options`] for callers without a runtime
    pub fn run_blocking(
        &self,
        target: &TargetBinding,
        script: impl Into<PathBuf>,
        model_paths: Vec<PathBuf>,
        options: &RunOptions,
    ) -> Result<ExecutionEnvironment, RunnerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunnerError::Runtime)?;
        runtime.block_on(self.run_with_options(target, script, model_paths, options))
    }
}

/// The run already finished; a failed purge is only reported
fn purge_quietly(env: &mut ExecutionEnvironment) {
    if let Err(e) = env.purge() {
        warn!(
            execution_id = %env.execution_id(),
            error = %e,
            "failed to purge execution environment"
        );
    }
}

/// Run with default settings (system temp directory)
pub async fn run(
    target: &TargetBinding,
    script: impl Into<PathBuf>,
    model_paths: Vec<PathBuf>,
    purge_after_run: bool,
) -> Result<ExecutionEnvironment, RunnerError> {
    Orchestrator::default().run(target, script, model_paths, purge_after_run).await
}
