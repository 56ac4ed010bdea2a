//! aidlink-ffi: C-ABI exports for debugger and host-application integrations.
//!
//! A handle wraps one `Transmitter`. Handles are not thread-safe: callers must
//! not use the same handle from two threads at once.

mod args;
mod error;
mod transmitter;
mod types;

use std::panic::AssertUnwindSafe;

pub use transmitter::{
    aid_transmitter_free, aid_transmitter_new, aid_transmitter_send_img, aid_transmitter_set_bias,
    aid_transmitter_set_flags, aid_transmitter_set_gain, aid_transmitter_set_par,
};
pub use types::{
    AidResult, AidTransmitterHandle, AID_DEFAULT_PORT, AID_ERR_CONNECT, AID_ERR_HANDSHAKE_TIMEOUT,
    AID_ERR_INTERNAL, AID_ERR_INVALID_ARGUMENT, AID_ERR_RECV, AID_ERR_RESOLVE, AID_ERR_SEND,
    AID_ERR_SOCKET, AID_FLAG_AUTO_GAIN_BIAS, AID_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Initialize process-wide transport state. Safe to call more than once.
#[no_mangle]
pub extern "C" fn aid_init() -> AidResult {
    ffi_boundary(AidResult::Internal, || {
        error::clear_error_state();
        match aidlink_transport::runtime::init() {
            Ok(()) => AidResult::Ok,
            Err(err) => {
                error::set_error_message(err.to_string());
                AidResult::SocketError
            }
        }
    })
}

/// Release process-wide transport state. Call once at program exit.
#[no_mangle]
pub extern "C" fn aid_cleanup() {
    ffi_boundary((), || {
        error::clear_error_state();
        aidlink_transport::runtime::teardown();
    });
}

/// Message describing the last failure on this thread (empty if none).
#[no_mangle]
pub extern "C" fn aid_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
