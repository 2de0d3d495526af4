//! Command Dispatcher
//!
//! Decides what an invocation does from the modifier state ([`plan`]), then
//! carries the plan out against its collaborators ([`Dispatcher::dispatch`]).
//! Nothing in here returns an error to the host: every outcome collapses to
//! [`CommandOutcome`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::command::CommandSpec;
use crate::detached::{DetachedExecutor, ThreadSpawner};
use crate::executor::{ExecutionRequest, ProcessScriptExecutor, ScriptExecutor};
use crate::modifiers::ModifierState;
use crate::reveal::{FileRevealer, SystemRevealer};
use crate::settings::DispatchSettings;
use crate::usage::{
    DefaultUsageLogger, InvocationContext, SharedUsageState, UsageLogStateSource, UsageLogger,
    UsageRecord,
};

/// The only two outcomes the host ever sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Succeeded,
    Cancelled,
}

impl CommandOutcome {
    /// 0 is success; every other code is reported as cancelled
    pub fn from_result_code(code: i32) -> Self {
        if code == 0 {
            CommandOutcome::Succeeded
        } else {
            CommandOutcome::Cancelled
        }
    }

    /// Host result value (Succeeded = 0, Cancelled = 1)
    pub fn host_code(self) -> i32 {
        match self {
            CommandOutcome::Succeeded => 0,
            CommandOutcome::Cancelled => 1,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandOutcome::Succeeded => write!(f, "succeeded"),
            CommandOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Show the selected script in the file browser and run nothing
    Reveal(PathBuf),
    Execute(ExecutionRequest),
}

/// Pure decision for one invocation. Alt wins over everything else.
pub fn plan(modifiers: ModifierState, command: &CommandSpec) -> DispatchPlan {
    let mut script = &command.script;
    let mut alt_script_mode = false;
    if modifiers.shift {
        script = &command.alternate_script;
        alt_script_mode = true;
    }
    let forced_debug = modifiers.ctrl;

    if modifiers.alt {
        return DispatchPlan::Reveal(script.clone());
    }

    DispatchPlan::Execute(ExecutionRequest {
        script: script.clone(),
        search_paths: command.search_paths.clone(),
        command_name: command.name.clone(),
        command_unique_id: command.unique_id.clone(),
        forced_debug,
        alt_script_mode,
    })
}

pub struct Dispatcher {
    executor: Arc<dyn ScriptExecutor>,
    revealer: Arc<dyn FileRevealer>,
    usage_state: Arc<dyn UsageLogStateSource>,
    logger: Arc<dyn UsageLogger>,
    spawner: Arc<dyn DetachedExecutor>,
}

impl Dispatcher {
    /// Dispatcher with system reveal, usage logging disabled, thread-spawned logging
    pub fn new(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            executor,
            revealer: Arc::new(SystemRevealer),
            usage_state: Arc::new(SharedUsageState::default()),
            logger: Arc::new(DefaultUsageLogger),
            spawner: Arc::new(ThreadSpawner),
        }
    }

    pub fn from_settings(settings: &DispatchSettings) -> Self {
        Self::new(Arc::new(ProcessScriptExecutor::new(settings.interpreter.clone())))
            .with_usage(Arc::new(settings.usage_state()), Arc::new(DefaultUsageLogger))
    }

    pub fn with_revealer(mut self, revealer: Arc<dyn FileRevealer>) -> Self {
        self.revealer = revealer;
        self
    }

    pub fn with_usage(
        mut self,
        state: Arc<dyn UsageLogStateSource>,
        logger: Arc<dyn UsageLogger>,
    ) -> Self {
        self.usage_state = state;
        self.logger = logger;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn DetachedExecutor>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn dispatch(
        &self,
        modifiers: ModifierState,
        command: &CommandSpec,
        context: &InvocationContext,
    ) -> CommandOutcome {
        let request = match plan(modifiers, command) {
            DispatchPlan::Reveal(script) => {
                if let Err(e) = self.revealer.reveal(&script) {
                    warn!(error = %e, "failed to reveal script");
                }
                return CommandOutcome::Succeeded;
            }
            DispatchPlan::Execute(request) => request,
        };

        // before execution: the script may change the live state
        let snapshot = self.usage_state.snapshot();

        debug!(
            command = %command.unique_id,
            script = %request.script.display(),
            forced_debug = request.forced_debug,
            alt_script_mode = request.alt_script_mode,
            "dispatching command"
        );
        let result = self.executor.execute(&request);
        let outcome = CommandOutcome::from_result_code(result.code);

        if snapshot.enabled {
            let record = UsageRecord::new(context, command, &request, &result);
            let logger = Arc::clone(&self.logger);
            self.spawner
                .spawn(Box::new(move || logger.log_usage(&snapshot, &record)));
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CommandSpec {
        CommandSpec {
            script: PathBuf::from("script.py"),
            alternate_script: PathBuf::from("config.py"),
            search_paths: "lib".to_string(),
            name: "Make Pattern".to_string(),
            bundle: "Make Pattern.pushbutton".to_string(),
            extension: "pyRevitTools".to_string(),
            unique_id: "pyrevittools-makepattern".to_string(),
        }
    }

    fn execute(plan: DispatchPlan) -> ExecutionRequest {
        match plan {
            DispatchPlan::Execute(request) => request,
            other => panic!("expected execution, got {other:?}"),
        }
    }

    #[test]
    fn no_modifiers_runs_primary_script() {
        let request = execute(plan(ModifierState::none(), &command()));
        assert_eq!(request.script, PathBuf::from("script.py"));
        assert!(!request.forced_debug && !request.alt_script_mode);
        assert_eq!(request.search_paths, "lib");
    }

    #[test]
    fn shift_selects_alternate_script() {
        let shift = ModifierState {
            shift: true,
            ..Default::default()
        };
        let request = execute(plan(shift, &command()));
        assert_eq!(request.script, PathBuf::from("config.py"));
        assert!(request.alt_script_mode);
        assert!(!request.forced_debug);
    }

    #[test]
    fn ctrl_forces_debug_on_primary_script() {
        let ctrl = ModifierState {
            ctrl: true,
            ..Default::default()
        };
        let request = execute(plan(ctrl, &command()));
        assert_eq!(request.script, PathBuf::from("script.py"));
        assert!(request.forced_debug);
        assert!(!request.alt_script_mode);
    }

    #[test]
    fn shift_and_ctrl_combine() {
        let modifiers = ModifierState {
            shift: true,
            ctrl: true,
            alt: false,
        };
        let request = execute(plan(modifiers, &command()));
        assert_eq!(request.script, PathBuf::from("config.py"));
        assert!(request.forced_debug && request.alt_script_mode);
    }

    #[test]
    fn alt_reveals_selected_script() {
        let alt = ModifierState { alt: true, ..Default::default() };
        assert_eq!(plan(alt, &command()), DispatchPlan::Reveal(PathBuf::from("script.py")));

        let shift_alt = ModifierState { shift: true, alt: true, ctrl: true };
        assert_eq!(plan(shift_alt, &command()), DispatchPlan::Reveal(PathBuf::from("config.py")));
    }

    #[test]
    fn only_zero_succeeds() {
        assert_eq!(CommandOutcome::from_result_code(0), CommandOutcome::Succeeded);
        for code in [1, -1, 2, 255, i32::MIN, i32::MAX] {
            assert_eq!(CommandOutcome::from_result_code(code), CommandOutcome::Cancelled);
        }
        assert_eq!(CommandOutcome::Cancelled.host_code(), 1);
        assert_eq!(CommandOutcome::Succeeded.to_string(), "succeeded");
    }
}
