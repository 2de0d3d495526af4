//! C ABI entry points for the host add-in.
//!
//! The add-in's command callback forwards the journal data map, the modifier
//! state and the invocation context here as JSON; the result is the host's
//! result value. No error or panic crosses this boundary.

use runner_dispatch::{
    Availability, CommandOutcome, CommandSpec, DispatchError, DispatchSettings, Dispatcher,
    InvocationContext, JournalData, ModifierState,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// What the add-in sends for one invocation
#[derive(Debug, Deserialize)]
pub struct InvocationPayload {
    /// Journal data map (ScriptSource, SearchPaths, Models, LogFile)
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub context: InvocationContext,
    #[serde(default)]
    pub settings_path: Option<String>,
}

pub fn decode_payload(
    json: &str,
) -> Result<(CommandSpec, InvocationContext, DispatchSettings), DispatchError> {
    let payload: InvocationPayload = serde_json::from_str(json).map_err(DispatchError::Payload)?;
    let command = CommandSpec::from_journal_data(&JournalData::from_map(payload.data))?;
    let settings = match payload.settings_path {
        Some(path) => DispatchSettings::load(path)?,
        None => DispatchSettings::default(),
    };
    Ok((command, payload.context, settings))
}

fn execute_payload(json: &str, modifiers: u32) -> CommandOutcome {
    match decode_payload(json) {
        Ok((command, context, settings)) => {
            Dispatcher::from_settings(&settings).dispatch(
                ModifierState::from_bits(modifiers),
                &command,
                &context,
            )
        }
        Err(e) => {
            error!(error = %e, "invalid invocation payload");
            CommandOutcome::Cancelled
        }
    }
}

unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// NUL-terminated crate version
#[no_mangle]
pub extern "C" fn runner_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Run the runner command. Returns 0 (succeeded) or 1 (cancelled).
///
/// # Safety
/// `payload_json` must be null or point to a NUL-terminated string that stays
/// valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn runner_execute_command(
    payload_json: *const c_char,
    modifiers: u32,
) -> i32 {
    init_logging();
    let Some(json) = read_str(payload_json) else {
        error!("payload is null or not UTF-8");
        return CommandOutcome::Cancelled.host_code();
    };
    catch_unwind(AssertUnwindSafe(|| execute_payload(json, modifiers)))
        .unwrap_or(CommandOutcome::Cancelled)
        .host_code()
}

/// Whether a command with the given availability (JSON) can run for the
/// selected categories (JSON array of names).
///
/// # Safety
/// Both pointers must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn runner_command_available(
    availability_json: *const c_char,
    categories_json: *const c_char,
) -> bool {
    let availability = read_str(availability_json)
        .and_then(|s| serde_json::from_str::<Availability>(s).ok())
        .unwrap_or_default();
    let categories: Vec<String> = read_str(categories_json)
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    availability.is_available(&categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn decodes_payload_into_runner_command() {
        let json = r#"{
            "data": {
                "ScriptSource": "C:/s.py",
                "SearchPaths": "",
                "Models": "C:/m.rvt",
                "LogFile": "C:/x.log"
            },
            "context": {"username": "jdoe"}
        }"#;
        let (command, context, settings) = decode_payload(json).unwrap();
        assert_eq!(command.script.to_str(), Some("C:/s.py"));
        assert_eq!(context.username.as_deref(), Some("jdoe"));
        assert!(!settings.usage_logging);
    }

    #[test]
    fn malformed_payload_is_reported_as_payload_error() {
        let err = decode_payload("{not json").unwrap_err();
        assert!(matches!(err, DispatchError::Payload(_)));
        assert!(err.to_string().starts_with("PAYLOAD/"));
    }

    #[test]
    fn bad_payload_is_cancelled() {
        let json = CString::new(r#"{"data": {}}"#).unwrap();
        assert_eq!(unsafe { runner_execute_command(json.as_ptr(), 0) }, 1);
        assert_eq!(unsafe { runner_execute_command(std::ptr::null(), 0) }, 1);
    }

    #[test]
    fn availability_over_ffi() {
        let availability = CString::new(r#"{"type": "category", "category": "Walls"}"#).unwrap();
        let walls = CString::new(r#"["Walls"]"#).unwrap();
        let mixed = CString::new(r#"["Walls", "Doors"]"#).unwrap();
        unsafe {
            assert!(runner_command_available(availability.as_ptr(), walls.as_ptr()));
            assert!(!runner_command_available(availability.as_ptr(), mixed.as_ptr()));
            assert!(runner_command_available(std::ptr::null(), std::ptr::null()));
        }
    }
}
