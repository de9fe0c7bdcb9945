//! C ABI for host UIs that embed the renderer directly instead of shelling
//! out to the CLI. Strings cross the boundary as NUL-terminated UTF-8; every
//! string returned by this module must be released with [`cf_string_free`].

use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::bilingual::process_translation_text;
use crate::config::{DisplayMode, RenderConfig};

static LAST_ERROR: Lazy<Mutex<Option<CString>>> = Lazy::new(|| Mutex::new(None));

fn set_last_error(msg: String) {
    let cstring = CString::new(msg.replace('\0', " "))
        .unwrap_or_else(|_| CString::new("error message unavailable").unwrap());
    *LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner()) = Some(cstring);
}

unsafe fn cstr_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{name} is null"));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("{name} is not valid UTF-8"))
}

/// Renders bilingual markup from an original/translated pair.
///
/// `display_mode` takes the same values as the config file ("disabled",
/// "folded", "unfolded", "original_first"); `force_sequential` is 0 or 1.
/// Returns a heap-allocated string, or null on error (see
/// [`cf_last_error_utf8`]).
///
/// # Safety
/// `original` and `translated` must point to NUL-terminated UTF-8 strings
/// that stay valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn cf_render_bilingual(
    original: *const c_char,
    translated: *const c_char,
    display_mode: *const c_char,
    force_sequential: c_int,
) -> *mut c_char {
    let parsed = (|| -> Result<(String, String, RenderConfig), String> {
        let original = cstr_arg(original, "original")?.to_string();
        let translated = cstr_arg(translated, "translated")?.to_string();
        let mode = if display_mode.is_null() {
            None
        } else {
            Some(cstr_arg(display_mode, "display_mode")?)
        };
        let cfg = RenderConfig {
            display_mode: DisplayMode::parse(mode),
            force_sequential_matching: force_sequential != 0,
            ..RenderConfig::default()
        };
        Ok((original, translated, cfg))
    })();

    let (original, translated, cfg) = match parsed {
        Ok(v) => v,
        Err(msg) => {
            set_last_error(msg);
            return std::ptr::null_mut();
        }
    };

    let outcome = process_translation_text(&original, &translated, &cfg);
    match CString::new(outcome.text.replace('\0', " ")) {
        Ok(out) => out.into_raw(),
        Err(_) => {
            set_last_error("rendered markup could not be converted".to_string());
            std::ptr::null_mut()
        }
    }
}

/// Returns the last error as a heap-allocated UTF-8 string, or null when no
/// error has been recorded. Release with [`cf_string_free`].
#[no_mangle]
pub extern "C" fn cf_last_error_utf8() -> *mut c_char {
    let guard = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(msg) => msg.clone().into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Releases a string returned by this module.
///
/// # Safety
/// `ptr` must be a pointer previously returned by this module, or null.
#[no_mangle]
pub unsafe extern "C" fn cf_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn render_round_trips_through_the_abi() {
        let original = CString::new("Hello.").unwrap();
        let translated = CString::new("안녕.").unwrap();
        let mode = CString::new("folded").unwrap();

        let ptr = unsafe {
            cf_render_bilingual(original.as_ptr(), translated.as_ptr(), mode.as_ptr(), 0)
        };
        assert!(!ptr.is_null());
        let markup = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { cf_string_free(ptr) };

        assert!(markup.contains("안녕."));
        assert!(markup.contains("Hello."));
    }

    #[test]
    fn null_input_sets_last_error() {
        let translated = CString::new("x").unwrap();
        let ptr = unsafe {
            cf_render_bilingual(std::ptr::null(), translated.as_ptr(), std::ptr::null(), 0)
        };
        assert!(ptr.is_null());

        let err_ptr = cf_last_error_utf8();
        assert!(!err_ptr.is_null());
        let msg = unsafe { CStr::from_ptr(err_ptr) }.to_str().unwrap().to_string();
        unsafe { cf_string_free(err_ptr) };
        assert!(msg.contains("original"));
    }
}
