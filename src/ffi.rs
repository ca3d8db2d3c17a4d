//! FFI bindings for Synheart Focus
//!
//! This module provides C-compatible functions for calling the focus tracker
//! from other languages. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `focus_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::TrackerConfig;
use crate::error::FocusError;
use crate::pipeline::{replay_to_report, FocusProcessor};
use crate::schema::TrackerEvent;
use crate::types::TimestampMs;

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

/// Serialize a value to a C string, recording any failure as the last error
fn json_to_cstr<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&FocusError::from(e).to_string());
            ptr::null_mut()
        }
    }
}

/// Parse an optional TOML config; NULL selects the defaults
unsafe fn config_from_ptr(config_toml: *const c_char) -> Result<TrackerConfig, String> {
    if config_toml.is_null() {
        return Ok(TrackerConfig::default());
    }
    let toml = cstr_to_string(config_toml).ok_or("Invalid config string pointer")?;
    TrackerConfig::from_toml_str(&toml).map_err(|e| FocusError::from(e).to_string())
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a recorded event stream (NDJSON or JSON array) into a report.
///
/// # Safety
/// - `events` must be a valid null-terminated C string.
/// - `config_toml` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_replay_to_report(
    events: *const c_char,
    config_toml: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let events_str = match cstr_to_string(events) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_toml) {
        Ok(config) => config,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match replay_to_report(&events_str, config) {
        Ok(report) => json_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a FocusProcessor
pub struct FocusProcessorHandle {
    processor: FocusProcessor,
}

/// Create a new FocusProcessor.
///
/// # Safety
/// - `config_toml` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer to a newly allocated FocusProcessor.
/// - Must be freed with `focus_processor_free`.
/// - Returns NULL on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_new(
    config_toml: *const c_char,
) -> *mut FocusProcessorHandle {
    clear_last_error();

    let config = match config_from_ptr(config_toml) {
        Ok(config) => config,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match FocusProcessor::with_config(config) {
        Ok(processor) => Box::into_raw(Box::new(FocusProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a FocusProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_free(processor: *mut FocusProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Start a tracking session at `now_ms`.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_start(
    processor: *mut FocusProcessorHandle,
    now_ms: TimestampMs,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    (*processor).processor.start(now_ms);
    0
}

/// Apply one focus.tracker_event.v1 event and return the live status JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - `event_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_process_event(
    processor: *mut FocusProcessorHandle,
    event_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(event_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid event string pointer");
            return ptr::null_mut();
        }
    };

    let event: TrackerEvent = match serde_json::from_str(&json_str) {
        Ok(event) => event,
        Err(e) => {
            set_last_error(&FocusError::from(e).to_string());
            return ptr::null_mut();
        }
    };

    match handle.processor.process_event(&event) {
        Ok(_) => json_to_cstr(&handle.processor.status()),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the live status JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_status(
    processor: *const FocusProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*processor).processor.status())
}

/// Get the session report JSON for the active session.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL when not tracking or on error; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_summary(
    processor: *const FocusProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    match (*processor).processor.session_report() {
        Some(report) => json_to_cstr(&report),
        None => {
            set_last_error(&FocusError::NotTracking.to_string());
            ptr::null_mut()
        }
    }
}

/// Stop the session at `now_ms` and return its final summary JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `focus_processor_new`.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL when no session was active; call `focus_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn focus_processor_stop(
    processor: *mut FocusProcessorHandle,
    now_ms: TimestampMs,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    match (*processor).processor.stop(now_ms) {
        Some(summary) => json_to_cstr(&summary),
        None => {
            set_last_error(&FocusError::NotTracking.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by focus functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a focus function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next focus function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn focus_last_error() -> *const c_char {
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
pub unsafe extern "C" fn focus_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame_time, SyntheticFace};
    use std::ffi::CString;

    fn event_cstring(event: &TrackerEvent) -> CString {
        CString::new(serde_json::to_string(event).unwrap()).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        focus_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let frame = SyntheticFace::centered().frame();

        unsafe {
            let processor = focus_processor_new(ptr::null());
            assert!(!processor.is_null());
            assert_eq!(focus_processor_start(processor, 0), 0);

            let start = event_cstring(&TrackerEvent::question_start(0, "q1", None));
            take_string(focus_processor_process_event(processor, start.as_ptr()));

            for n in 1..=12 {
                let event = event_cstring(&TrackerEvent::frame(frame_time(n), Some(frame.clone())));
                let status = take_string(focus_processor_process_event(processor, event.as_ptr()));
                let status: serde_json::Value = serde_json::from_str(&status).unwrap();
                assert_eq!(status["is_focused"], true);
            }

            let status = take_string(focus_processor_status(processor));
            let status: serde_json::Value = serde_json::from_str(&status).unwrap();
            assert_eq!(status["average_focus_score"], 100);
            assert_eq!(status["total_frames"], 12);

            let report = take_string(focus_processor_summary(processor));
            assert!(report.contains("focus.session_report.v1"));

            let summary = take_string(focus_processor_stop(processor, frame_time(13)));
            let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
            assert_eq!(summary["questions"]["q1"]["difficulty"], "easy");

            // Second stop has no session to close
            assert!(focus_processor_stop(processor, frame_time(14)).is_null());
            assert!(!focus_last_error().is_null());

            focus_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_replay() {
        let events = [
            TrackerEvent::frame(0, None),
            TrackerEvent::frame(33, None),
        ];
        let ndjson = events
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let input = CString::new(ndjson).unwrap();
        let config = CString::new("[aggregator]\nwarmup_frames = 0\n").unwrap();

        unsafe {
            let report = take_string(focus_replay_to_report(input.as_ptr(), config.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert_eq!(report["session"]["total_frames"], 2);
            assert_eq!(report["session"]["focus_score"], 0);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let bad_config = CString::new("[debounce]\naway_confirmation_frames = 0\n").unwrap();
            assert!(focus_processor_new(bad_config.as_ptr()).is_null());
            let error = CStr::from_ptr(focus_last_error()).to_str().unwrap();
            assert!(error.contains("confirmation"), "{}", error);

            let processor = focus_processor_new(ptr::null());
            let invalid = CString::new("not json").unwrap();
            assert!(focus_processor_process_event(processor, invalid.as_ptr()).is_null());
            assert!(!focus_last_error().is_null());

            assert!(focus_processor_status(ptr::null()).is_null());
            focus_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = focus_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }
}
