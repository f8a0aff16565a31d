//! FFI layer for host-language renderers.
//!
//! This module provides C-compatible functions so a rendering layer written
//! in another language can drive a [`FormState`]. All data crosses the
//! boundary as JSON strings. Remote collaborators cannot cross the boundary,
//! so async options and async validation are unavailable here.
//!
//! # Memory Management
//!
//! - Strings returned by `formwork_*` functions are allocated by Rust
//! - Caller must free them with `formwork_string_free`
//! - Form pointers must be freed with `formwork_form_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! # Drafts
//!
//! The host owns draft storage. Pass a previously exported draft to
//! `formwork_form_new`, and persist what `formwork_form_export_draft` returns.

use crate::{DraftPayload, Error, FieldValue, FormSchema, FormState, Timestamp};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Outcome of a validation pass.
#[derive(serde::Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    errors: &'a crate::FormErrors,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `formwork_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => c"{\"error\":\"string contained null bytes\"}"
            .to_owned()
            .into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn null_form() -> *mut c_char {
    to_c_string(FfiResult::<()>::err("null form pointer").to_json())
}

// ============================================================================
// Form Lifecycle
// ============================================================================

/// Create a new form session.
///
/// # Arguments
/// - `schema_json`: JSON string of FormSchema
/// - `draft_json`: JSON string of a previously exported DraftPayload, or null
///
/// A draft that fails to parse or was saved under another schema version is
/// ignored and the form starts from schema defaults.
///
/// # Returns
/// Pointer to FormState, or null if the schema is invalid.
///
/// # Safety
/// - `schema_json` must be a valid null-terminated C string or null
/// - `draft_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `formwork_form_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_new(
    schema_json: *const c_char,
    draft_json: *const c_char,
) -> *mut FormState {
    let schema_str = match from_c_string(schema_json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let schema = match FormSchema::from_json(&schema_str) {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let restored = from_c_string(draft_json)
        .and_then(|raw| DraftPayload::from_json(&raw).ok())
        .filter(|draft| draft.check_version(&schema).is_ok())
        .map(|draft| draft.values);

    match FormState::new(schema, restored) {
        Ok(form) => Box::into_raw(Box::new(form)),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a form.
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn formwork_form_free(form: *mut FormState) {
    if !form.is_null() {
        drop(Box::from_raw(form));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `formwork_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn formwork_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// Set one field's value.
///
/// # Arguments
/// - `name`: Field name
/// - `value_json`: JSON primitive or array of primitives
///
/// # Returns
/// JSON string: `{"ok": <previous value or null>}` or `{"error": "message"}`
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - `name` and `value_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_set_value(
    form: *mut FormState,
    name: *const c_char,
    value_json: *const c_char,
) -> *mut c_char {
    let form = match form.as_mut() {
        Some(f) => f,
        None => return null_form(),
    };

    let name = match from_c_string(name) {
        Some(n) => n,
        None => return to_c_string(FfiResult::<()>::err("invalid field name").to_json()),
    };

    let value_str = match from_c_string(value_json) {
        Some(v) => v,
        None => return to_c_string(FfiResult::<()>::err("invalid value JSON").to_json()),
    };

    let value: FieldValue = match serde_json::from_str(&value_str) {
        Ok(v) => v,
        Err(e) => {
            let err = Error::InvalidValue(e.to_string());
            return to_c_string(FfiResult::<()>::err(err.to_string()).to_json());
        }
    };

    let previous = form.set_value(&name, value);
    to_c_string(FfiResult::ok(previous).to_json())
}

/// Mark a field as touched.
///
/// # Returns
/// JSON string: `{"ok": true}` if newly touched, `{"ok": false}` otherwise
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - `name` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_set_touched(
    form: *mut FormState,
    name: *const c_char,
) -> *mut c_char {
    let form = match form.as_mut() {
        Some(f) => f,
        None => return null_form(),
    };

    match from_c_string(name) {
        Some(name) => to_c_string(FfiResult::ok(form.set_touched(&name)).to_json()),
        None => to_c_string(FfiResult::<()>::err("invalid field name").to_json()),
    }
}

/// Run a full validation pass.
///
/// # Returns
/// JSON string: `{"ok": {"valid": bool, "errors": {...}}}`
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_validate(form: *mut FormState) -> *mut c_char {
    let form = match form.as_mut() {
        Some(f) => f,
        None => return null_form(),
    };

    let valid = form.validate();
    let report = ValidationReport {
        valid,
        errors: form.errors(),
    };
    to_c_string(FfiResult::ok(report).to_json())
}

/// Restore schema defaults and clear touched and error state.
///
/// The host should discard its stored draft as well.
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_reset(form: *mut FormState) -> *mut c_char {
    let form = match form.as_mut() {
        Some(f) => f,
        None => return null_form(),
    };

    form.reset();
    to_c_string(FfiResult::ok(()).to_json())
}

// ============================================================================
// Queries
// ============================================================================

/// Get all current values.
///
/// # Returns
/// JSON string: `{"ok": {<name>: <value>, ...}}`
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_values(form: *const FormState) -> *mut c_char {
    match form.as_ref() {
        Some(f) => to_c_string(FfiResult::ok(f.values()).to_json()),
        None => null_form(),
    }
}

/// Get the errors from the last validation pass.
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_errors(form: *const FormState) -> *mut c_char {
    match form.as_ref() {
        Some(f) => to_c_string(FfiResult::ok(f.errors()).to_json()),
        None => null_form(),
    }
}

/// Get one field's resolved state.
///
/// # Returns
/// JSON string: `{"ok": {"visible", "enabled", "required"}}` or
/// `{"error": "field not found: <name>"}`
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - `name` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_field_state(
    form: *const FormState,
    name: *const c_char,
) -> *mut c_char {
    let form = match form.as_ref() {
        Some(f) => f,
        None => return null_form(),
    };

    let name = match from_c_string(name) {
        Some(n) => n,
        None => return to_c_string(FfiResult::<()>::err("invalid field name").to_json()),
    };

    match form.resolved(&name) {
        Some(state) => to_c_string(FfiResult::ok(state).to_json()),
        None => to_c_string(FfiResult::<()>::err(Error::FieldNotFound(name).to_string()).to_json()),
    }
}

/// Get every leaf field's resolved state.
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_field_states(form: *const FormState) -> *mut c_char {
    match form.as_ref() {
        Some(f) => to_c_string(FfiResult::ok(f.field_states()).to_json()),
        None => null_form(),
    }
}

/// Check whether any field has been touched.
///
/// # Returns
/// 1 if dirty, 0 if clean, -1 on null pointer
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
#[no_mangle]
pub unsafe extern "C" fn formwork_form_is_dirty(form: *const FormState) -> i32 {
    match form.as_ref() {
        Some(f) => i32::from(f.is_dirty()),
        None => -1,
    }
}

/// Export the current draft.
///
/// # Arguments
/// - `now`: Timestamp in milliseconds, recorded as `savedAt`
///
/// # Returns
/// JSON string: `{"ok": DraftPayload}` once the form is dirty, `{"ok": null}`
/// before that
///
/// # Safety
/// - `form` must be a valid pointer from `formwork_form_new` or null
/// - Caller must free the returned string with `formwork_string_free`
#[no_mangle]
pub unsafe extern "C" fn formwork_form_export_draft(
    form: *const FormState,
    now: Timestamp,
) -> *mut c_char {
    match form.as_ref() {
        Some(f) => to_c_string(FfiResult::ok(f.draft_payload(now)).to_json()),
        None => null_form(),
    }
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn formwork_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
