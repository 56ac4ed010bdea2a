use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Bytes of a required C string argument (without the terminator).
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_bytes_arg<'a>(value: *const c_char, name: &str) -> Option<&'a [u8]> {
    if value.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }

    // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
    Some(unsafe { CStr::from_ptr(value) }.to_bytes())
}

/// Bytes of an optional C string argument; null maps to `None`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn optional_bytes_arg<'a>(value: *const c_char) -> Option<&'a [u8]> {
    if value.is_null() {
        return None;
    }

    // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
    Some(unsafe { CStr::from_ptr(value) }.to_bytes())
}

/// Host name argument as UTF-8.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn host_arg<'a>(value: *const c_char) -> Option<&'a str> {
    // SAFETY: Forwarded caller guarantee.
    let bytes = unsafe { required_bytes_arg(value, "host") }?;
    match std::str::from_utf8(bytes) {
        Ok(host) => Some(host),
        Err(_) => {
            let _ = error::set_invalid_argument("host must be valid UTF-8");
            None
        }
    }
}

/// Payload pointer + signed length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn payload_arg<'a>(data: *const u8, len: i32) -> Option<&'a [u8]> {
    if len < 0 {
        let _ = error::set_invalid_argument(format!("size_in_bytes cannot be negative ({len})"));
        return None;
    }
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument("data cannot be null when size_in_bytes > 0");
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len as usize) })
}
