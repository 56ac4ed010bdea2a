use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use aidlink_client::TransmitError;
use aidlink_frame::FrameError;
use aidlink_transport::TransportError;

use crate::types::AidResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> AidResult {
    set_error_message(message);
    AidResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_transmit_error(err: &TransmitError) -> AidResult {
    set_error_message(format!("[{}] {err}", err.stage()));
    match err {
        TransmitError::Transport(TransportError::HostTooLong { .. }) => AidResult::InvalidArgument,
        TransmitError::Transport(
            TransportError::Resolve { .. } | TransportError::NoAddress { .. },
        ) => AidResult::ResolveError,
        TransmitError::Transport(TransportError::ConnectRetriesExhausted { .. }) => {
            AidResult::ConnectError
        }
        TransmitError::Transport(_) => AidResult::SocketError,
        TransmitError::Frame(FrameError::PayloadTooLarge { .. }) => {
            AidResult::InvalidArgument
        }
        TransmitError::Frame(_) => AidResult::SendError,
        TransmitError::Recv(_) | TransmitError::PeerClosed => AidResult::RecvError,
        TransmitError::HandshakeTimeout { .. } => AidResult::HandshakeTimeout,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
