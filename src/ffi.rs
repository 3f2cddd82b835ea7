//! FFI bindings for the Healthwear relay
//!
//! This module provides C-compatible functions for driving a dispatcher from
//! the host platform. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `relay_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde_json::Value;

use crate::config::RelayConfig;
use crate::dispatcher::TelemetryDispatcher;
use crate::sink::CollectingSink;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

// ============================================================================
// Dispatcher API
// ============================================================================

/// Opaque handle to a dispatcher collecting records for the host
pub struct RelayDispatcherHandle {
    dispatcher: TelemetryDispatcher<CollectingSink>,
}

/// Create a new dispatcher.
///
/// # Safety
/// - `config_json` may be NULL (default configuration) or a valid
///   null-terminated C string holding a JSON configuration object.
/// - Returns a pointer that must be freed with `relay_dispatcher_free`.
/// - Returns NULL on error; call `relay_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_new(
    config_json: *const c_char,
) -> *mut RelayDispatcherHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        RelayConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid UTF-8 in configuration string");
                return ptr::null_mut();
            }
        };
        match RelayConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let dispatcher = TelemetryDispatcher::with_config(CollectingSink::new(), &config);
    Box::into_raw(Box::new(RelayDispatcherHandle { dispatcher }))
}

/// Dispatch one raw event and return the delivered records as a JSON array.
///
/// The array holds zero or one record (`[]` when the event was dropped or
/// unrecognized).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `relay_dispatcher_new`.
/// - `event_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `relay_free_string`.
/// - Returns NULL on error; call `relay_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_push(
    handle: *mut RelayDispatcherHandle,
    event_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null dispatcher handle");
        return ptr::null_mut();
    }
    let handle = &mut *handle;

    let json = match cstr_to_string(event_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid event string pointer");
            return ptr::null_mut();
        }
    };

    if let Err(e) = handle.dispatcher.dispatch_json(&json) {
        set_last_error(&e.to_string());
        return ptr::null_mut();
    }

    let records: Vec<Value> = handle
        .dispatcher
        .sink_mut()
        .drain()
        .into_iter()
        .map(|metric| Value::Object(metric.to_record()))
        .collect();

    match serde_json::to_string(&records) {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Start a new recording session and return its id.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `relay_dispatcher_new`.
/// - Returns a newly allocated string that must be freed with `relay_free_string`.
/// - Returns NULL if `handle` is NULL.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_begin_session(
    handle: *mut RelayDispatcherHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null dispatcher handle");
        return ptr::null_mut();
    }
    let session = (*handle).dispatcher.begin_session();
    string_to_cstr(&session.to_string())
}

/// Stop delivering records (host moved to background).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `relay_dispatcher_new`.
/// - Returns 0 on success, -1 if `handle` is NULL.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_pause(handle: *mut RelayDispatcherHandle) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null dispatcher handle");
        return -1;
    }
    (*handle).dispatcher.pause();
    0
}

/// Resume delivering records.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `relay_dispatcher_new`.
/// - Returns 0 on success, -1 if `handle` is NULL.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_resume(handle: *mut RelayDispatcherHandle) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null dispatcher handle");
        return -1;
    }
    (*handle).dispatcher.resume();
    0
}

/// Free a dispatcher.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `relay_dispatcher_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn relay_dispatcher_free(handle: *mut RelayDispatcherHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by relay functions.
///
/// # Safety
/// - `s` must be a pointer returned by a relay function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn relay_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next relay function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn relay_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the relay version string.
///
/// # Safety
/// - Returns a pointer to a static string.
/// - Do NOT free the returned pointer.
#[no_mangle]
pub unsafe extern "C" fn relay_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
