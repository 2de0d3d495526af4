//! Binary entrypoint for the playback runner.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runner_core::{render_journal, JournalFields, Orchestrator, RunnerConfig};
use runner_dispatch::{
    CommandSpec, DispatchSettings, Dispatcher, InvocationContext, JoinableSpawner, JournalData,
    ModifierState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "runner",
    version,
    about = "Run scripts inside the host application through journal playback"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script in a fresh execution environment and wait for the host to exit
    Run {
        #[arg(long, env = "RUNNER_CONFIG")]
        config: PathBuf,
        #[arg(long)]
        script: PathBuf,
        #[arg(long = "model")]
        models: Vec<PathBuf>,
        /// Delete the working directory after the host exits
        #[arg(long)]
        purge: bool,
        /// Kill the host after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print the journal a run would generate
    Journal {
        #[arg(long)]
        script: PathBuf,
        #[arg(long = "model")]
        models: Vec<PathBuf>,
        #[arg(long)]
        log_file: PathBuf,
    },
    /// Replay the command side of a journal through the dispatcher
    Dispatch {
        #[arg(long)]
        journal: PathBuf,
        #[arg(long)]
        settings: Option<PathBuf>,
        #[arg(long)]
        shift: bool,
        #[arg(long)]
        ctrl: bool,
        #[arg(long)]
        alt: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            config,
            script,
            models,
            purge,
            timeout,
        } => {
            let config = RunnerConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let mut options = config.run_options();
            options.purge_after_run |= purge;
            if let Some(secs) = timeout {
                options.timeout = Some(Duration::from_secs(secs));
            }

            let orchestrator = Orchestrator::new(config.environment_settings());
            let env = orchestrator
                .run_with_options(&config.target, script, models, &options)
                .await
                .context("run failed")?;

            println!("execution_id: {}", env.execution_id());
            println!("journal: {}", env.journal_file().display());
            println!("log: {}", env.log_file().display());
            println!("purged: {}", env.is_purged());
            Ok(if env.exit_code() == Some(0) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Journal {
            script,
            models,
            log_file,
        } => {
            let text = render_journal(&JournalFields::new(&script, &models, &log_file))?;
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Command::Dispatch {
            journal,
            settings,
            shift,
            ctrl,
            alt,
        } => {
            let settings = match settings {
                Some(path) => DispatchSettings::load(&path)?,
                None => DispatchSettings::default(),
            };
            let data = JournalData::load(&journal)?;
            let command = CommandSpec::from_journal_data(&data)?;
            let context = InvocationContext {
                username: std::env::var("USER").or_else(|_| std::env::var("USERNAME")).ok(),
                ..Default::default()
            };

            let spawner = Arc::new(JoinableSpawner::new());
            let outcome = Dispatcher::from_settings(&settings)
                .with_spawner(spawner.clone())
                .dispatch(ModifierState { shift, ctrl, alt }, &command, &context);
            println!("{}", outcome);

            // usage logging outlives dispatch; finish it before the process goes away
            tokio::task::spawn_blocking(move || spawner.join_all())
                .await
                .context("waiting for usage logging")?;
            Ok(ExitCode::from(outcome.host_code() as u8))
        }
    }
}
