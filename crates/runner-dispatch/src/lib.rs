//! Runner Dispatch: what happens inside the host when a command fires
//!
//! ```text
//! modifiers ─► plan ─┬─► Reveal ─────────────────────────► Succeeded
//!                    └─► Execute ─► snapshot ─► executor ─► Succeeded | Cancelled
//!                                                  └─► usage log (detached)
//! ```

pub mod availability;
pub mod command;
pub mod detached;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod journal_data;
pub mod modifiers;
pub mod reveal;
pub mod settings;
pub mod usage;

pub use availability::Availability;
pub use command::CommandSpec;
pub use detached::{DetachedExecutor, DetachedTask, JoinableSpawner, ThreadSpawner, TokioSpawner};
pub use dispatcher::{plan, CommandOutcome, DispatchPlan, Dispatcher};
pub use error::DispatchError;
pub use executor::{ExecutionRequest, ExecutionResult, ProcessScriptExecutor, ScriptExecutor};
pub use journal_data::JournalData;
pub use modifiers::ModifierState;
pub use reveal::{FileRevealer, SystemRevealer};
pub use settings::DispatchSettings;
pub use usage::{
    DefaultUsageLogger, FileUsageLogger, InvocationContext, ServerUsageLogger, SharedUsageState,
    UsageLogSnapshot, UsageLogStateSource, UsageLogger, UsageRecord,
};
