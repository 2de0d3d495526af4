//! Usage logging
//!
//! The dispatcher captures a [`UsageLogSnapshot`] before running a script and
//! hands that immutable value to the logger afterwards. Scripts may change the
//! live usage state while they run; the record always reflects the state the
//! invocation started with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::command::CommandSpec;
use crate::error::DispatchError;
use crate::executor::{ExecutionRequest, ExecutionResult};

/// Usage logging state at the moment a command was invoked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogSnapshot {
    pub enabled: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub server_url: Option<String>,
}

pub trait UsageLogStateSource: Send + Sync {
    fn snapshot(&self) -> UsageLogSnapshot;
}

/// Live usage state shared between the host and the scripts it runs
#[derive(Debug, Clone, Default)]
pub struct SharedUsageState {
    inner: Arc<Mutex<UsageLogSnapshot>>,
}

impl SharedUsageState {
    pub fn new(initial: UsageLogSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut UsageLogSnapshot)) {
        let mut state = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }
}

impl UsageLogStateSource for SharedUsageState {
    fn snapshot(&self) -> UsageLogSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Who invoked the command, as far as the host tells us
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

/// One usage log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub context: InvocationContext,
    pub command_name: String,
    pub command_bundle: String,
    pub command_extension: String,
    pub command_unique_id: String,
    pub script: PathBuf,
    pub forced_debug: bool,
    pub alt_script_mode: bool,
    pub result_code: i32,
    #[serde(default)]
    pub result_data: BTreeMap<String, String>,
}

impl UsageRecord {
    pub fn new(
        context: &InvocationContext,
        command: &CommandSpec,
        request: &ExecutionRequest,
        result: &ExecutionResult,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            context: context.clone(),
            command_name: command.name.clone(),
            command_bundle: command.bundle.clone(),
            command_extension: command.extension.clone(),
            command_unique_id: command.unique_id.clone(),
            script: request.script.clone(),
            forced_debug: request.forced_debug,
            alt_script_mode: request.alt_script_mode,
            result_code: result.code,
            result_data: result.data.clone(),
        }
    }
}

pub trait UsageLogger: Send + Sync {
    fn log_usage(
        &self,
        snapshot: &UsageLogSnapshot,
        record: &UsageRecord,
    ) -> Result<(), DispatchError>;
}

/// Appends records as JSON lines to the snapshot's log file
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUsageLogger;

impl UsageLogger for FileUsageLogger {
    fn log_usage(
        &self,
        snapshot: &UsageLogSnapshot,
        record: &UsageRecord,
    ) -> Result<(), DispatchError> {
        let Some(path) = &snapshot.log_file else {
            return Ok(());
        };
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let io_err = |source| DispatchError::UsageLog {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)
    }
}

/// Posts records as JSON to the snapshot's usage server
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerUsageLogger;

impl UsageLogger for ServerUsageLogger {
    fn log_usage(
        &self,
        snapshot: &UsageLogSnapshot,
        record: &UsageRecord,
    ) -> Result<(), DispatchError> {
        let Some(url) = &snapshot.server_url else {
            return Ok(());
        };
        debug!(url = %url, command = %record.command_unique_id, "posting usage record");
        ureq::post(url.as_str())
            .header("Content-Type", "application/json")
            .send_json(record)
            .map_err(|source| DispatchError::UsageServer {
                url: url.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Every destination the snapshot names: the log file, then the server.
///
/// A failing destination does not stop the next one; the first error is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUsageLogger;

impl UsageLogger for DefaultUsageLogger {
    fn log_usage(
        &self,
        snapshot: &UsageLogSnapshot,
        record: &UsageRecord,
    ) -> Result<(), DispatchError> {
        let to_file = FileUsageLogger.log_usage(snapshot, record);
        let to_server = ServerUsageLogger.log_usage(snapshot, record);
        match (to_file, to_server) {
            (Err(file_err), Err(server_err)) => {
                warn!(error = %server_err, "usage server rejected record");
                Err(file_err)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    fn record() -> UsageRecord {
        let command = CommandSpec {
            script: PathBuf::from("a.py"),
            alternate_script: PathBuf::from("config.py"),
            search_paths: String::new(),
            name: "Tag All".to_string(),
            bundle: "Tag All.pushbutton".to_string(),
            extension: "pyRevitTools".to_string(),
            unique_id: "pyrevittools-tagall".to_string(),
        };
        let request = ExecutionRequest {
            script: command.script.clone(),
            search_paths: String::new(),
            command_name: command.name.clone(),
            command_unique_id: command.unique_id.clone(),
            forced_debug: false,
            alt_script_mode: false,
        };
        let context = InvocationContext {
            username: Some("jdoe".to_string()),
            ..Default::default()
        };
        UsageRecord::new(&context, &command, &request, &ExecutionResult::from_code(2))
    }

    #[test]
    fn snapshot_is_detached_from_live_state() {
        let state = SharedUsageState::new(UsageLogSnapshot {
            enabled: true,
            ..Default::default()
        });
        let before = state.snapshot();
        state.update(|s| s.enabled = false);
        assert!(before.enabled);
        assert!(!state.snapshot().enabled);
    }

    #[test]
    fn file_logger_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = UsageLogSnapshot {
            enabled: true,
            log_file: Some(dir.path().join("usage.jsonl")),
            server_url: None,
        };
        FileUsageLogger.log_usage(&snapshot, &record()).unwrap();
        FileUsageLogger.log_usage(&snapshot, &record()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("usage.jsonl")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["username"], "jdoe");
        assert_eq!(parsed["result_code"], 2);
        assert_eq!(parsed["command_name"], "Tag All");
    }

    #[test]
    fn file_logger_without_destination_is_a_no_op() {
        let snapshot = UsageLogSnapshot {
            enabled: true,
            ..Default::default()
        };
        assert!(FileUsageLogger.log_usage(&snapshot, &record()).is_ok());
        assert!(ServerUsageLogger.log_usage(&snapshot, &record()).is_ok());
    }

    /// Accepts one HTTP request, answers 200 and hands back the request body
    fn one_shot_server() -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/usage", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    return;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        });
                    let body = &text[end + 4..];
                    let complete = match length {
                        Some(length) => body.len() >= length,
                        None => body.ends_with("0\r\n\r\n"),
                    };
                    if complete {
                        let response = "HTTP/1.1 200 OK\r\n\
                                        Content-Length: 0\r\n\
                                        Connection: close\r\n\r\n";
                        stream.write_all(response.as_bytes()).unwrap();
                        tx.send(body.to_string()).unwrap();
                        return;
                    }
                }
            }
        });
        (url, rx)
    }

    #[test]
    fn server_logger_posts_record() {
        let (url, rx) = one_shot_server();
        let snapshot = UsageLogSnapshot {
            enabled: true,
            log_file: None,
            server_url: Some(url),
        };
        ServerUsageLogger.log_usage(&snapshot, &record()).unwrap();

        let body = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(body.contains("\"command_unique_id\":\"pyrevittools-tagall\""));
        assert!(body.contains("\"username\":\"jdoe\""));
    }

    #[test]
    fn unreachable_server_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/usage", listener.local_addr().unwrap());
        drop(listener);
        let snapshot = UsageLogSnapshot {
            enabled: true,
            log_file: None,
            server_url: Some(url),
        };
        let err = ServerUsageLogger.log_usage(&snapshot, &record()).unwrap_err();
        assert!(matches!(err, DispatchError::UsageServer { .. }));
    }

    #[test]
    fn default_logger_writes_file_even_when_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/usage", listener.local_addr().unwrap());
        drop(listener);
        let snapshot = UsageLogSnapshot {
            enabled: true,
            log_file: Some(dir.path().join("usage.jsonl")),
            server_url: Some(url),
        };

        assert!(DefaultUsageLogger.log_usage(&snapshot, &record()).is_err());
        let content = std::fs::read_to_string(dir.path().join("usage.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
