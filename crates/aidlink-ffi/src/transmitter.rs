use std::os::raw::{c_char, c_float, c_int, c_uint, c_void};
use std::time::Duration;

use aidlink_client::{AuxFlags, ImageDescriptor, Transmitter, DEFAULT_HOST};

use crate::args;
use crate::error;
use crate::types::{AidResult, AidTransmitterHandle, TransmitterHandle};

fn with_transmitter_mut<T>(
    handle: AidTransmitterHandle,
    on_error: T,
    f: impl FnOnce(&mut TransmitterHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("transmitter handle cannot be null");
        return on_error;
    }

    let transmitter_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut TransmitterHandle) }
    };

    f(transmitter_handle)
}

/// Create a transmitter aimed at the default viewer (`127.0.0.1:5999`).
///
/// Release with `aid_transmitter_free`.
#[no_mangle]
pub extern "C" fn aid_transmitter_new() -> AidTransmitterHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        let handle = TransmitterHandle {
            transmitter: Transmitter::new(),
        };
        Box::into_raw(Box::new(handle)) as AidTransmitterHandle
    })
}

/// Free a transmitter handle.
///
/// # Safety
/// `handle` must be null or a handle previously returned by `aid_transmitter_new`.
#[no_mangle]
pub unsafe extern "C" fn aid_transmitter_free(handle: AidTransmitterHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by aid_transmitter_new.
        unsafe {
            drop(Box::from_raw(handle as *mut TransmitterHandle));
        }
    });
}

/// Set viewer port, host and I/O timeout in milliseconds.
///
/// A null `host` selects the default host; `timeout_ms <= 0` disables the
/// timeout.
///
/// # Safety
/// `handle` must be a valid transmitter handle. `host` must be null or a
/// NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn aid_transmitter_set_par(
    handle: AidTransmitterHandle,
    port: c_uint,
    host: *const c_char,
    timeout_ms: c_int,
) -> AidResult {
    crate::ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();

        let Ok(port) = u16::try_from(port) else {
            return error::set_invalid_argument(format!("port out of range: {port}"));
        };
        let host = if host.is_null() {
            DEFAULT_HOST
        } else {
            // SAFETY: Null was handled above; the caller guarantees termination.
            match unsafe { args::host_arg(host) } {
                Some(host) => host,
                None => return AidResult::InvalidArgument,
            }
        };
        let timeout = Duration::from_millis(u64::try_from(timeout_ms).unwrap_or(0));

        with_transmitter_mut(handle, AidResult::InvalidArgument, |h| {
            match h.transmitter.configure(port, host, timeout) {
                Ok(()) => AidResult::Ok,
                Err(err) => error::map_transmit_error(&err),
            }
        })
    })
}

/// Set the gain of channel `channel` (0..4). Other indices are ignored.
///
/// # Safety
/// `handle` must be a valid transmitter handle.
#[no_mangle]
pub unsafe extern "C" fn aid_transmitter_set_gain(
    handle: AidTransmitterHandle,
    channel: c_int,
    value: c_float,
) -> AidResult {
    crate::ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();
        with_transmitter_mut(handle, AidResult::InvalidArgument, |h| {
            if let Ok(channel) = usize::try_from(channel) {
                h.transmitter.set_gain(channel, value);
            }
            AidResult::Ok
        })
    })
}

/// Set the bias of channel `channel` (0..4). Other indices are ignored.
///
/// # Safety
/// `handle` must be a valid transmitter handle.
#[no_mangle]
pub unsafe extern "C" fn aid_transmitter_set_bias(
    handle: AidTransmitterHandle,
    channel: c_int,
    value: c_float,
) -> AidResult {
    crate::ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();
        with_transmitter_mut(handle, AidResult::InvalidArgument, |h| {
            if let Ok(channel) = usize::try_from(channel) {
                h.transmitter.set_bias(channel, value);
            }
            AidResult::Ok
        })
    })
}

/// Replace the auxiliary flags word. Unknown bits are transmitted unchanged.
///
/// # Safety
/// `handle` must be a valid transmitter handle.
#[no_mangle]
pub unsafe extern "C" fn aid_transmitter_set_flags(
    handle: AidTransmitterHandle,
    flags: c_uint,
) -> AidResult {
    crate::ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();
        with_transmitter_mut(handle, AidResult::InvalidArgument, |h| {
            h.transmitter.set_flags(AuxFlags::from_bits_retain(flags));
            AidResult::Ok
        })
    })
}

/// Send one image to the configured viewer.
///
/// Blocks through connect, readiness wait and transfer. `name` and `notes`
/// may be null.
///
/// # Safety
/// `handle` must be a valid transmitter handle. `format` must be a
/// NUL-terminated C string; `name` and `notes` must be null or NUL-terminated.
/// If `size_in_bytes > 0`, `data` must be readable for that many bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn aid_transmitter_send_img(
    handle: AidTransmitterHandle,
    width: c_uint,
    height: c_uint,
    format: *const c_char,
    size_in_bytes: c_int,
    data: *const c_void,
    name: *const c_char,
    notes: *const c_char,
    row_stride_bits: c_uint,
) -> AidResult {
    crate::ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();

        // SAFETY: Argument helpers validate null; the caller guarantees the rest.
        let Some(format) = (unsafe { args::required_bytes_arg(format, "format") }) else {
            return AidResult::InvalidArgument;
        };
        // SAFETY: See above.
        let Some(payload) = (unsafe { args::payload_arg(data as *const u8, size_in_bytes) }) else {
            return AidResult::InvalidArgument;
        };
        // SAFETY: See above.
        let name = unsafe { args::optional_bytes_arg(name) };
        // SAFETY: See above.
        let notes = unsafe { args::optional_bytes_arg(notes) };

        let mut desc = ImageDescriptor::new(width, height, format, payload)
            .with_row_stride_bits(row_stride_bits);
        if let Some(name) = name {
            desc = desc.with_name(name);
        }
        if let Some(notes) = notes {
            desc = desc.with_notes(notes);
        }

        with_transmitter_mut(handle, AidResult::InvalidArgument, |h| {
            match h.transmitter.send(&desc) {
                Ok(_) => AidResult::Ok,
                Err(err) => error::map_transmit_error(&err),
            }
        })
    })
}
