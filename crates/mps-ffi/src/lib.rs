//! C FFI bindings for mps-core
//!
//! This crate provides a C-compatible API so a native UI can load a
//! SavedVariables file and receive the projected runs as JSON.

use mps_core::{ingest, DuplicatePolicy, FileSource, IngestConfig, RunsById};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to projected runs
pub struct MpsRuns {
    inner: RunsById,
}

/// Write `message` to `error_out` if the caller asked for it
unsafe fn set_error(error_out: *mut *mut c_char, message: &str) {
    if error_out.is_null() {
        return;
    }
    *error_out = CString::new(message.replace('\0', " "))
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut());
}

/// Load, parse and project a SavedVariables file
///
/// # Safety
/// - `path` must be a valid C string
/// - `error_out` must be null or a valid pointer; on failure it receives a
///   message that must be freed with `mps_free_string`
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn mps_ingest_file(
    path: *const c_char,
    strict: bool,
    error_out: *mut *mut c_char,
) -> *mut MpsRuns {
    if !error_out.is_null() {
        *error_out = ptr::null_mut();
    }

    let mut source = if path.is_null() {
        FileSource::unselected()
    } else {
        match CStr::from_ptr(path).to_str() {
            Ok(s) => FileSource::new(s),
            Err(_) => {
                set_error(error_out, "path is not valid UTF-8");
                return ptr::null_mut();
            }
        }
    };

    let mut config = IngestConfig::default();
    if strict {
        config.duplicates = DuplicatePolicy::Reject;
    }

    match ingest(&mut source, &config) {
        Ok(runs) => Box::into_raw(Box::new(MpsRuns { inner: runs })),
        Err(e) => {
            set_error(error_out, &e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free runs returned by `mps_ingest_file`
///
/// # Safety
/// - `runs` must be a valid pointer returned by `mps_ingest_file` or null
#[no_mangle]
pub unsafe extern "C" fn mps_free_runs(runs: *mut MpsRuns) {
    if !runs.is_null() {
        drop(Box::from_raw(runs));
    }
}

/// Get the total number of runs
///
/// # Safety
/// - `runs` must be a valid pointer returned by `mps_ingest_file`
#[no_mangle]
pub unsafe extern "C" fn mps_run_count(runs: *const MpsRuns) -> usize {
    if runs.is_null() {
        return 0;
    }
    (*runs).inner.run_count()
}

/// Get the number of maps
///
/// # Safety
/// - `runs` must be a valid pointer returned by `mps_ingest_file`
#[no_mangle]
pub unsafe extern "C" fn mps_map_count(runs: *const MpsRuns) -> usize {
    if runs.is_null() {
        return 0;
    }
    (*runs).inner.maps().len()
}

/// Serialize the runs as pretty-printed JSON
///
/// # Safety
/// - `runs` must be a valid pointer returned by `mps_ingest_file`
/// - Returns null on error
/// - Caller must free the returned string with `mps_free_string`
#[no_mangle]
pub unsafe extern "C" fn mps_runs_to_json(runs: *const MpsRuns) -> *mut c_char {
    if runs.is_null() {
        return ptr::null_mut();
    }

    serde_json::to_string_pretty(&(*runs).inner)
        .ok()
        .and_then(|json| CString::new(json).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a mps_* function or null
#[no_mangle]
pub unsafe extern "C" fn mps_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let text = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        unsafe { mps_free_string(s) };
        text
    }

    #[test]
    fn test_ingest_and_serialize() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"MythicPlusStatsDB = { ["runsById"] = { [2] = { [10] = { ["success"] = { { ["runId"] = 1001, ["score"] = 320.5 } } } } } }"#,
        )
        .unwrap();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();

        let mut error: *mut c_char = ptr::null_mut();
        let runs = unsafe { mps_ingest_file(path.as_ptr(), false, &mut error) };
        assert!(!runs.is_null());
        assert!(error.is_null());

        unsafe {
            assert_eq!(mps_run_count(runs), 1);
            assert_eq!(mps_map_count(runs), 1);
        }

        let json: serde_json::Value =
            serde_json::from_str(&take_string(unsafe { mps_runs_to_json(runs) })).unwrap();
        assert_eq!(json["2"]["10"]["success"]["1001"]["score"], 320.5);

        unsafe { mps_free_runs(runs) };
    }

    #[test]
    fn test_error_message() {
        let mut error: *mut c_char = ptr::null_mut();
        let runs = unsafe { mps_ingest_file(ptr::null(), false, &mut error) };
        assert!(runs.is_null());
        assert_eq!(take_string(error), "no file selected");
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(mps_run_count(ptr::null()), 0);
            assert_eq!(mps_map_count(ptr::null()), 0);
            assert!(mps_runs_to_json(ptr::null()).is_null());
            mps_free_runs(ptr::null_mut());
            mps_free_string(ptr::null_mut());
        }
    }
}
