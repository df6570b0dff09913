//! FFI bindings for Touchprint
//!
//! This module provides C-compatible functions so a handheld host UI can drive a
//! session. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `touchprint_free_string`.
//!
//! Callbacks are not exposed across the boundary. The host calls
//! `touchprint_session_poll` on its UI thread, which applies finished network
//! exchanges and returns the queued notifications as a JSON array.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::ClientConfig;
use crate::session::{Mode, QueuedListener, Session, StrokeOutcome};
use crate::stroke::{FeatureExtractor, Stroke, TouchSample};

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

/// Mode codes accepted by `touchprint_session_initialize`
pub const TOUCHPRINT_MODE_TRAINING: i32 = 0;
pub const TOUCHPRINT_MODE_FREE: i32 = 1;

/// Outcome codes returned by `touchprint_touch_up`
pub const TOUCHPRINT_STROKE_DISCARDED: i32 = 0;
pub const TOUCHPRINT_STROKE_STORED: i32 = 1;
pub const TOUCHPRINT_STROKE_CAP_REACHED: i32 = 2;
pub const TOUCHPRINT_STROKE_SUBMITTED: i32 = 3;

// ============================================================================
// Stateless API
// ============================================================================

/// Extract a feature record from a JSON array of touch samples.
///
/// # Safety
/// - `samples_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `touchprint_free_string`.
/// - Returns NULL on error; call `touchprint_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touchprint_extract_features(
    user_id: i64,
    samples_json: *const c_char,
    velocity_percentile: f64,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let samples: Vec<TouchSample> = match serde_json::from_str(&json_str) {
        Ok(samples) => samples,
        Err(e) => {
            set_last_error(&format!("Invalid samples JSON: {e}"));
            return ptr::null_mut();
        }
    };

    let stroke = Stroke::from_samples(samples.into_iter().map(TouchSample::sanitized).collect());
    let record = FeatureExtractor::new(velocity_percentile).extract(user_id, &stroke);
    match record.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Session API
// ============================================================================

/// Opaque handle to a Session
pub struct TouchprintSessionHandle {
    session: Session,
    notifications: QueuedListener,
}

/// Create a new session.
///
/// # Safety
/// - `config_json` may be NULL (defaults plus environment overrides) or a valid
///   null-terminated C string holding a JSON config object.
/// - Returns a pointer that must be freed with `touchprint_session_free`.
/// - Returns NULL on error; call `touchprint_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_new(
    config_json: *const c_char,
) -> *mut TouchprintSessionHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        ClientConfig::from_env()
    } else {
        match cstr_to_string(config_json) {
            Some(json) => ClientConfig::from_json(&json).and_then(|c| c.with_env_overrides()),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let notifications = QueuedListener::new();
    let session = Session::from_config(config, notifications.clone());
    Box::into_raw(Box::new(TouchprintSessionHandle {
        session,
        notifications,
    }))
}

/// Free a session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_free(handle: *mut TouchprintSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start a training (`TOUCHPRINT_MODE_TRAINING`) or free (`TOUCHPRINT_MODE_FREE`) phase.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `touchprint_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_initialize(
    handle: *mut TouchprintSessionHandle,
    user_id: i64,
    mode: i32,
    phase_cap: u32,
    starting_count: u32,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    let handle = &mut *handle;

    let mode = match mode {
        TOUCHPRINT_MODE_TRAINING => Mode::Training,
        TOUCHPRINT_MODE_FREE => Mode::Free,
        other => {
            set_last_error(&format!("Unknown mode {other}"));
            return -1;
        }
    };

    match handle
        .session
        .initialize(user_id, mode, phase_cap, starting_count)
    {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Return the session to its uninitialized state.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_reset(handle: *mut TouchprintSessionHandle) {
    if let Some(handle) = handle.as_mut() {
        handle.session.reset();
        handle.notifications.drain();
    }
}

/// Report a touch-down sample.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn touchprint_touch_down(
    handle: *mut TouchprintSessionHandle,
    x: f64,
    y: f64,
    timestamp_ms: i64,
    pressure: f64,
    contact_size: f64,
    contact_major: f64,
    contact_minor: f64,
) {
    if let Some(handle) = handle.as_mut() {
        handle.session.touch_down(TouchSample::new(
            x,
            y,
            timestamp_ms,
            pressure,
            contact_size,
            contact_major,
            contact_minor,
        ));
    }
}

/// Report a touch-move sample.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn touchprint_touch_move(
    handle: *mut TouchprintSessionHandle,
    x: f64,
    y: f64,
    timestamp_ms: i64,
    pressure: f64,
    contact_size: f64,
    contact_major: f64,
    contact_minor: f64,
) {
    if let Some(handle) = handle.as_mut() {
        handle.session.touch_move(TouchSample::new(
            x,
            y,
            timestamp_ms,
            pressure,
            contact_size,
            contact_major,
            contact_minor,
        ));
    }
}

/// Report touch-up. Returns one of the `TOUCHPRINT_STROKE_*` codes, or -1 for
/// a NULL handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn touchprint_touch_up(
    handle: *mut TouchprintSessionHandle,
    timestamp_ms: i64,
) -> i32 {
    let Some(handle) = handle.as_mut() else {
        return -1;
    };
    match handle.session.touch_up(timestamp_ms) {
        StrokeOutcome::Discarded => TOUCHPRINT_STROKE_DISCARDED,
        StrokeOutcome::Stored { .. } => TOUCHPRINT_STROKE_STORED,
        StrokeOutcome::CapReached => TOUCHPRINT_STROKE_CAP_REACHED,
        StrokeOutcome::Submitted => TOUCHPRINT_STROKE_SUBMITTED,
    }
}

/// Query the store's count for the current user; the answer arrives through
/// `touchprint_session_poll` as a `stored_count` notification.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_refresh_count(
    handle: *mut TouchprintSessionHandle,
) -> i32 {
    clear_last_error();

    let Some(handle) = handle.as_mut() else {
        set_last_error("Null session pointer");
        return -1;
    };
    match handle.session.refresh_count() {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Apply finished network exchanges and return queued notifications as a JSON array.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`.
/// - Must be called from the thread that drives the session.
/// - Returns a newly allocated string that must be freed with `touchprint_free_string`.
/// - Returns NULL on error; call `touchprint_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_poll(
    handle: *mut TouchprintSessionHandle,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_mut() else {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    };

    handle.session.process_completions();
    let notifications = handle.notifications.drain();
    match serde_json::to_string(&notifications) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Snapshot of the session state as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `touchprint_session_new`.
/// - Returns a newly allocated string that must be freed with `touchprint_free_string`.
/// - Returns NULL on error; call `touchprint_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touchprint_session_summary(
    handle: *const TouchprintSessionHandle,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle.as_ref() else {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    };

    match serde_json::to_string(&handle.session.summary()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a static string that is valid until the next Touchprint call.
/// - Returns NULL if no error occurred.
/// - Do NOT free this pointer.
#[no_mangle]
pub unsafe extern "C" fn touchprint_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Touchprint functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Touchprint function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn touchprint_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
