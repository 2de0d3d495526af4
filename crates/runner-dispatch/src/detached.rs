//! Fire-and-forget work items.
//!
//! A detached task's failure is only ever reported through `tracing`; it never
//! reaches whoever spawned it.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::warn;

use crate::error::DispatchError;

pub type DetachedTask = Box<dyn FnOnce() -> Result<(), DispatchError> + Send + 'static>;

pub trait DetachedExecutor: Send + Sync {
    /// Start `task` and return immediately
    fn spawn(&self, task: DetachedTask);
}

fn run_and_report(task: DetachedTask) {
    if let Err(e) = task() {
        warn!(error = %e, "detached task failed");
    }
}

fn spawn_thread(task: DetachedTask) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("usage-log".to_string())
        .spawn(move || run_and_report(task));
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "failed to start detached task");
            None
        }
    }
}

/// One OS thread per task
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl DetachedExecutor for ThreadSpawner {
    fn spawn(&self, task: DetachedTask) {
        spawn_thread(task);
    }
}

/// One OS thread per task, with the handles kept so a short-lived process can
/// wait for outstanding work before it exits.
///
/// `spawn` still returns immediately; only [`JoinableSpawner::join_all`] blocks.
#[derive(Debug, Clone, Default)]
pub struct JoinableSpawner {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl JoinableSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks spawned and not yet joined
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Block until every task spawned so far has finished
    pub fn join_all(&self) {
        let handles = std::mem::take(&mut *self.lock());
        for handle in handles {
            if handle.join().is_err() {
                warn!("detached task panicked");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DetachedExecutor for JoinableSpawner {
    fn spawn(&self, task: DetachedTask) {
        if let Some(handle) = spawn_thread(task) {
            self.lock().push(handle);
        }
    }
}

/// Runs tasks on a tokio runtime's blocking pool
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawner on the runtime the caller is running in, if any
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl DetachedExecutor for TokioSpawner {
    fn spawn(&self, task: DetachedTask) {
        drop(self.handle.spawn_blocking(move || run_and_report(task)));
    }
}
