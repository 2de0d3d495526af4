//! Showing a script in the OS file browser
use std::path::Path;
use std::process::Command;

use crate::error::DispatchError;

pub trait FileRevealer: Send + Sync {
    fn reveal(&self, path: &Path) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRevealer;

impl SystemRevealer {
    fn command(path: &Path) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("explorer.exe");
            // explorer accepts the path as a separate argument after "/select,"
            command.arg("/select,").arg(path);
            command
        } else if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg("-R").arg(path);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(path.parent().unwrap_or(path));
            command
        }
    }
}

impl FileRevealer for SystemRevealer {
    /// Starts the file browser without waiting for it
    fn reveal(&self, path: &Path) -> Result<(), DispatchError> {
        Self::command(path)
            .spawn()
            .map(drop)
            .map_err(|source| DispatchError::Reveal {
                path: path.to_path_buf(),
                source,
            })
    }
}
