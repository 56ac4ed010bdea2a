//! Process-wide transport state.
//!
//! [`init`] runs the platform setup at most once per process until a matching
//! [`teardown`]. On Unix it ignores `SIGPIPE` so that writes to a viewer that
//! went away surface as `EPIPE` errors instead of killing the host process.
//! On Windows it brackets socket use with `WSAStartup` / `WSACleanup`.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{Result, TransportError};

static STATE: Mutex<Option<RuntimeState>> = Mutex::new(None);

struct RuntimeState {
    #[cfg(unix)]
    previous_sigpipe: libc::sighandler_t,
}

/// Initialize the transport runtime. Subsequent calls are no-ops.
pub fn init() -> Result<()> {
    let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
    if state.is_some() {
        return Ok(());
    }
    *state = Some(platform_init()?);
    debug!("transport runtime initialized");
    Ok(())
}

/// Undo [`init`]. Does nothing if the runtime is not initialized.
pub fn teardown() {
    let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = state.take() {
        platform_teardown(previous);
        debug!("transport runtime torn down");
    }
}

/// Whether [`init`] has run without a later [`teardown`].
pub fn is_initialized() -> bool {
    STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

#[cfg(unix)]
fn platform_init() -> Result<RuntimeState> {
    // SAFETY: installing SIG_IGN for SIGPIPE has no handler code to race with.
    let previous = unsafe { libc::signal(libc::SIGPIPE, libc::SIG_IGN) };
    if previous == libc::SIG_ERR {
        return Err(TransportError::Runtime(std::io::Error::last_os_error()));
    }
    Ok(RuntimeState {
        previous_sigpipe: previous,
    })
}

#[cfg(unix)]
fn platform_teardown(state: RuntimeState) {
    // SAFETY: restores the disposition returned by the earlier `signal` call.
    unsafe {
        libc::signal(libc::SIGPIPE, state.previous_sigpipe);
    }
}

#[cfg(windows)]
fn platform_init() -> Result<RuntimeState> {
    use windows_sys::Win32::Networking::WinSock::{WSAStartup, WSADATA};

    // SAFETY: WSADATA is a plain C struct; all-zero is a valid initial value.
    let mut data: WSADATA = unsafe { std::mem::zeroed() };
    // SAFETY: `data` is a valid writable WSADATA for the duration of the call.
    let rc = unsafe { WSAStartup(0x0202, &mut data) };
    if rc != 0 {
        return Err(TransportError::Runtime(std::io::Error::from_raw_os_error(rc)));
    }
    Ok(RuntimeState {})
}

#[cfg(windows)]
fn platform_teardown(_state: RuntimeState) {
    // SAFETY: paired with the successful WSAStartup in `platform_init`.
    unsafe {
        windows_sys::Win32::Networking::WinSock::WSACleanup();
    }
}

#[cfg(not(any(unix, windows)))]
fn platform_init() -> Result<RuntimeState> {
    Ok(RuntimeState {})
}

#[cfg(not(any(unix, windows)))]
fn platform_teardown(_state: RuntimeState) {}
