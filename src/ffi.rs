//! FFI bindings for therapy-progress
//!
//! This module provides C-compatible functions for calling the engine from the
//! mobile and web shells. All functions take and return null-terminated JSON
//! strings; returned strings must be freed with `progress_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classify::{classify_predominance, RatioClassificationPolicy};
use crate::config::{CallSite, EngineConfig};
use crate::error::ProgressError;
use crate::pipeline::{attention_report, billing_report, session_report, ProgressEngine};
use crate::types::Counts;
use crate::window::WindowFilters;
use serde::Serialize;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result to the caller, recording the error on failure
fn into_cstr(result: Result<String, ProgressError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Optional JSON argument: NULL selects the default value
unsafe fn optional_json<T>(ptr: *const c_char, what: &str) -> Result<T, ProgressError>
where
    T: Default + serde::de::DeserializeOwned,
{
    if ptr.is_null() {
        return Ok(T::default());
    }
    let json = cstr_to_string(ptr)
        .ok_or_else(|| ProgressError::ParseError(format!("Invalid {} string", what)))?;
    serde_json::from_str(&json).map_err(|e| ProgressError::ParseError(format!("{}: {}", what, e)))
}

fn parse_call_site(name: &str) -> Result<CallSite, ProgressError> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| ProgressError::ParseError(format!("Unknown call site: {}", name)))
}

#[derive(Serialize)]
struct CountsClassification {
    status: &'static str,
    independence_ratio: u32,
    total: u32,
}

/// Classify a single counts object under a named rule set:
/// `strict_four_way`, `inclusive_five_way` or `predominance`.
fn classify_counts_json(counts_json: &str, rule: &str) -> Result<String, ProgressError> {
    let counts: Counts = serde_json::from_str(counts_json)?;
    let status = match rule {
        "strict_four_way" => RatioClassificationPolicy::strict_four_way()
            .classify(&counts)
            .status
            .as_str(),
        "inclusive_five_way" => RatioClassificationPolicy::inclusive_five_way()
            .classify(&counts)
            .status
            .as_str(),
        "predominance" => classify_predominance(&counts)
            .map(|outcome| outcome.as_str())
            .unwrap_or("insuficiente"),
        other => {
            return Err(ProgressError::ParseError(format!(
                "Unknown classification rule: {}",
                other
            )))
        }
    };

    let result = CountsClassification {
        status,
        independence_ratio: counts.independence_ratio(),
        total: counts.total(),
    };
    serde_json::to_string(&result).map_err(ProgressError::JsonError)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build the attention report for a JSON array of sessions.
///
/// # Safety
/// - `sessions_json` must be a valid null-terminated C string.
/// - `config_json` and `filters_json` may be NULL to use defaults.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_attention_report(
    sessions_json: *const c_char,
    config_json: *const c_char,
    filters_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let sessions = match cstr_to_string(sessions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid sessions string pointer");
            return ptr::null_mut();
        }
    };

    let config: EngineConfig = match optional_json(config_json, "config") {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let filters: WindowFilters = match optional_json(filters_json, "filters") {
        Ok(filters) => filters,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    into_cstr(attention_report(&sessions, &config, &filters))
}

/// Build the report of one session as a given screen shows it.
///
/// # Safety
/// - `session_json` and `call_site` must be valid null-terminated C strings.
///   `call_site` is one of `session_registration`, `last_session_preview`,
///   `sessions_list`, `attention_report`.
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_session_report(
    session_json: *const c_char,
    config_json: *const c_char,
    call_site: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let session = match cstr_to_string(session_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid session string pointer");
            return ptr::null_mut();
        }
    };

    let site = match cstr_to_string(call_site).map(|name| parse_call_site(&name)) {
        Some(Ok(site)) => site,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid call site string pointer");
            return ptr::null_mut();
        }
    };

    let config: EngineConfig = match optional_json(config_json, "config") {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    into_cstr(session_report(&session, &config, site))
}

/// Bill a JSON array of `{"start": "HH:MM", "end": "HH:MM"}` meetings.
///
/// # Safety
/// - `meetings_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_billing_report(meetings_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let meetings = match cstr_to_string(meetings_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid meetings string pointer");
            return ptr::null_mut();
        }
    };

    into_cstr(billing_report(&meetings))
}

/// Classify one `{"erro", "ajuda", "indep"}` counts object.
///
/// # Safety
/// - `counts_json` and `rule` must be valid null-terminated C strings.
///   `rule` is one of `strict_four_way`, `inclusive_five_way`, `predominance`.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_classify_counts(
    counts_json: *const c_char,
    rule: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let counts = match cstr_to_string(counts_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid counts string pointer");
            return ptr::null_mut();
        }
    };

    let rule = match cstr_to_string(rule) {
        Some(s) => s,
        None => {
            set_last_error("Invalid rule string pointer");
            return ptr::null_mut();
        }
    };

    into_cstr(classify_counts_json(&counts, &rule))
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to a ProgressEngine
pub struct ProgressEngineHandle {
    engine: ProgressEngine,
}

/// Create a new ProgressEngine from a JSON configuration.
///
/// # Safety
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a pointer that must be freed with `progress_engine_free`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_new(config_json: *const c_char) -> *mut ProgressEngineHandle {
    clear_last_error();

    let config: EngineConfig = match optional_json(config_json, "config") {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let handle = Box::new(ProgressEngineHandle {
        engine: ProgressEngine::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free a ProgressEngine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_free(engine: *mut ProgressEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Attention report with the engine's configuration.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`.
/// - `sessions_json` must be a valid null-terminated C string.
/// - `filters_json` may be NULL to apply no filters.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_attention_report(
    engine: *const ProgressEngineHandle,
    sessions_json: *const c_char,
    filters_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let sessions = match cstr_to_string(sessions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid sessions string pointer");
            return ptr::null_mut();
        }
    };

    let filters: WindowFilters = match optional_json(filters_json, "filters") {
        Ok(filters) => filters,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    into_cstr(handle.engine.attention_report(&sessions, &filters))
}

/// Progress series with the engine's configuration.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `progress_engine_new`.
/// - `sessions_json` must be a valid null-terminated C string.
/// - `stimulus_id` may be NULL to include every stimulus.
/// - Returns a newly allocated string that must be freed with `progress_free_string`.
/// - Returns NULL on error; call `progress_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn progress_engine_progress_report(
    engine: *const ProgressEngineHandle,
    sessions_json: *const c_char,
    stimulus_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let sessions = match cstr_to_string(sessions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid sessions string pointer");
            return ptr::null_mut();
        }
    };

    let stimulus = if stimulus_id.is_null() {
        None
    } else {
        match cstr_to_string(stimulus_id) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid stimulus id string");
                return ptr::null_mut();
            }
        }
    };

    into_cstr(handle.engine.progress_report(&sessions, stimulus.as_deref()))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `progress_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn progress_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `progress_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn progress_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn progress_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
