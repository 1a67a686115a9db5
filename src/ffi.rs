//! C-compatible boundary
//!
//! # Error convention
//!
//! Both recognition entry points return a freshly allocated, NUL-terminated
//! UTF-8 string on success and NULL on failure. After a NULL return the
//! caller queries [`ocr_last_error_code`] and [`ocr_last_error_message`] on
//! the same thread. Every entry point clears the previous error first.
//!
//! # Ownership
//!
//! Every non-NULL `char *` returned from this module is owned by the caller
//! and must be released exactly once with [`ocr_string_free`]. Never pass it
//! to `free()`, never free it twice.
//!
//! # Lifetime
//!
//! The pipeline (engine, coordinate convention) is built once per process,
//! either explicitly through [`ocr_init`] or on the first recognition call
//! from the default configuration location. Later [`ocr_init`] calls cannot
//! change it.

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::OnceLock;
use tracing::{error, warn};

use crate::config;
use crate::error::{ErrorCode, OcrError, OcrResult};
use crate::pipeline::OcrPipeline;

static PIPELINE: OnceLock<Result<OcrPipeline, String>> = OnceLock::new();

thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(err: &OcrError) {
    error!("OCR request failed [{}]: {}", err.error_code(), err);
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some((err.code(), err.to_string())));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn build_pipeline(config_path: Option<&Path>) -> Result<OcrPipeline, String> {
    let config = match config_path {
        Some(path) => config::load_config(path)
            .map_err(|e| format!("failed to load configuration {}: {}", path.display(), e))?,
        None => config::load_or_default(),
    };
    OcrPipeline::from_config(&config).map_err(|e| e.to_string())
}

fn pipeline() -> OcrResult<&'static OcrPipeline> {
    PIPELINE
        .get_or_init(|| build_pipeline(None))
        .as_ref()
        .map_err(|reason| OcrError::EngineUnavailable(reason.clone()))
}

/// Read a caller-supplied C string as a path
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string.
unsafe fn read_path(ptr: *const c_char) -> OcrResult<PathBuf> {
    if ptr.is_null() {
        return Err(OcrError::ImageNotFound(PathBuf::new()));
    }
    let raw = CStr::from_ptr(ptr);
    let path = raw
        .to_str()
        .map_err(|e| OcrError::Encoding(format!("image path is not valid UTF-8: {}", e)))?;
    Ok(PathBuf::from(path))
}

fn into_c_string(text: String) -> OcrResult<CString> {
    CString::new(text).map_err(|e| {
        OcrError::Encoding(format!(
            "output contains a NUL byte at offset {} and cannot cross the C boundary",
            e.nul_position()
        ))
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {}", msg)
    } else {
        "panic with unknown payload".to_string()
    }
}

/// Run one boundary call: clear the error, catch panics, hand out a fresh buffer
fn boundary_call<F>(call: F) -> *mut c_char
where
    F: FnOnce() -> OcrResult<String>,
{
    clear_last_error();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| call().and_then(into_c_string)));
    match outcome {
        Ok(Ok(text)) => text.into_raw(),
        Ok(Err(err)) => {
            set_last_error(&err);
            ptr::null_mut()
        }
        Err(payload) => {
            set_last_error(&OcrError::Internal(panic_message(payload)));
            ptr::null_mut()
        }
    }
}

/// Initialize the process-wide pipeline from a TOML configuration file.
///
/// Pass NULL to use the default configuration location. Returns 0 on success
/// or an error code; the message is available through
/// [`ocr_last_error_message`].
///
/// # Safety
/// `config_path` must be NULL or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ocr_init(config_path: *const c_char) -> i32 {
    clear_last_error();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> OcrResult<()> {
        let path = if config_path.is_null() {
            None
        } else {
            let raw = CStr::from_ptr(config_path)
                .to_str()
                .map_err(|e| OcrError::Encoding(format!("config path is not valid UTF-8: {}", e)))?;
            Some(PathBuf::from(raw))
        };

        if PIPELINE.get().is_some() {
            warn!("OCR pipeline already initialized, ignoring configuration {:?}", path);
        }
        PIPELINE
            .get_or_init(|| build_pipeline(path.as_deref()))
            .as_ref()
            .map(|_| ())
            .map_err(|reason| OcrError::EngineUnavailable(reason.clone()))
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(OcrError::Internal(panic_message(payload))),
    };
    match result {
        Ok(()) => ErrorCode::None as i32,
        Err(err) => {
            set_last_error(&err);
            err.code() as i32
        }
    }
}

/// Recognize text in an image, returning the fragments joined by newlines.
///
/// Returns an empty string when no text is found and NULL on failure.
///
/// # Safety
/// `image_path` must be NULL or point to a NUL-terminated string. The
/// returned pointer must be released with [`ocr_string_free`].
#[no_mangle]
pub unsafe extern "C" fn ocr_recognize_text_from_image(image_path: *const c_char) -> *mut c_char {
    boundary_call(|| {
        let path = read_path(image_path)?;
        pipeline()?.recognize_text(&path)
    })
}

/// Recognize text in an image, returning a JSON array of
/// `{text, x, y, width, height, confidence}` records in reading order.
///
/// Coordinates use a top-left origin, normalized to [0, 1] unless the
/// configuration selects pixels. Returns `[]` when no text is found and NULL
/// on failure.
///
/// # Safety
/// `image_path` must be NULL or point to a NUL-terminated string. The
/// returned pointer must be released with [`ocr_string_free`].
#[no_mangle]
pub unsafe extern "C" fn ocr_recognize_text_with_position_from_image(
    image_path: *const c_char,
) -> *mut c_char {
    boundary_call(|| {
        let path = read_path(image_path)?;
        pipeline()?.recognize_with_position(&path)
    })
}

/// Error code of the last failed call on this thread (0 if none)
#[no_mangle]
pub extern "C" fn ocr_last_error_code() -> i32 {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(ErrorCode::None as i32)
    })
}

/// Message of the last failed call on this thread, or NULL if none.
///
/// The returned pointer must be released with [`ocr_string_free`].
#[no_mangle]
pub extern "C" fn ocr_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some((_, message)) => CString::new(message.replace('\0', " "))
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()),
        None => ptr::null_mut(),
    })
}

/// Release a string returned by this library. NULL is ignored.
///
/// # Safety
/// `s` must be NULL or a pointer previously returned by this library that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn ocr_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_call_success_returns_fresh_buffer() {
        let ptr = boundary_call(|| Ok("Hello\nWorld".to_string()));
        assert!(!ptr.is_null());
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        assert_eq!(text, "Hello\nWorld");
        assert_eq!(ocr_last_error_code(), 0);
        unsafe { ocr_string_free(ptr) };
    }

    #[test]
    fn test_boundary_call_error_sets_last_error() {
        let ptr = boundary_call(|| Err(OcrError::ImageNotFound(PathBuf::from("x.png"))));
        assert!(ptr.is_null());
        assert_eq!(ocr_last_error_code(), ErrorCode::ImageNotFound as i32);

        let message = ocr_last_error_message();
        assert!(!message.is_null());
        let text = unsafe { CStr::from_ptr(message) }.to_str().unwrap().to_string();
        assert!(text.contains("x.png"));
        unsafe { ocr_string_free(message) };

        // The next successful call clears the error
        let ok = boundary_call(|| Ok(String::new()));
        assert_eq!(ocr_last_error_code(), 0);
        assert!(ocr_last_error_message().is_null());
        unsafe { ocr_string_free(ok) };
    }

    #[test]
    fn test_interior_nul_is_encoding_error() {
        let ptr = boundary_call(|| Ok("bad\0text".to_string()));
        assert!(ptr.is_null());
        assert_eq!(ocr_last_error_code(), ErrorCode::Encoding as i32);
    }

    #[test]
    fn test_panic_does_not_cross_boundary() {
        let ptr = boundary_call(|| panic!("engine exploded"));
        assert!(ptr.is_null());
        assert_eq!(ocr_last_error_code(), ErrorCode::Internal as i32);
    }

    #[test]
    fn test_null_path_is_not_found() {
        let err = unsafe { read_path(ptr::null()) }.unwrap_err();
        assert!(matches!(err, OcrError::ImageNotFound(_)));
    }

    #[test]
    fn test_invalid_utf8_path_is_encoding_error() {
        let bytes = CString::new(vec![0x66, 0xff, 0x66]).unwrap();
        let err = unsafe { read_path(bytes.as_ptr()) }.unwrap_err();
        assert!(matches!(err, OcrError::Encoding(_)));
    }

    #[test]
    fn test_free_null_is_noop() {
        unsafe { ocr_string_free(ptr::null_mut()) };
    }
}
